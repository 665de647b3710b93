//! Result persistence: atomic file writes and the JSON result store.

use crate::error::Result;
use crate::paper::PaperRecord;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Atomically write JSON data to a file.
///
/// Serializes `data` to pretty-printed JSON (two-space indent, non-ASCII kept
/// literal), writes to a `<name>.tmp` sibling file, then renames it over the
/// target.
/// Creates parent directories if they don't exist.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// Atomically write raw bytes to a file.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// `results.json` becomes `results.json.tmp`, so siblings sharing the stem
/// are left alone.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load and deserialize JSON from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value =
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

/// Reads and writes annotated paper records as a JSON array.
pub struct ResultStore;

impl ResultStore {
    /// Write `papers` to `path`, replacing any previous content.
    pub fn save(papers: &[PaperRecord], path: &Path) -> Result<()> {
        atomic_write_json(path, &papers)?;
        info!(path = %path.display(), count = papers.len(), "Saved results");
        Ok(())
    }

    /// Read records previously written by [`ResultStore::save`].
    pub fn load(path: &Path) -> Result<Vec<PaperRecord>> {
        load_json(path)?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("results file not found: {}", path.display()),
            )
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaperlensError;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(id: &str, title: &str) -> PaperRecord {
        let mut p = PaperRecord::new(id, title);
        p.authors = vec!["Søren Kierkegaard".to_string(), "李小龙".to_string()];
        p.r#abstract = "Über die Entropie — naïve café.".to_string();
        p.published = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap();
        p.updated = NaiveDate::from_ymd_opt(2022, 2, 28).unwrap();
        p.pdf_url = format!("http://arxiv.org/pdf/{}", id);
        p.categories = vec!["physics.gen-ph".to_string()];
        p.primary_category = "physics.gen-ph".to_string();
        p
    }

    #[test]
    fn test_save_load_roundtrip_with_non_ascii() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let papers = vec![
            record("2101.00001v1", "Résumé of φ-fields").with_analysis("Key finding: ∑ converges."),
            record("2101.00002v2", "Second").with_error("quota exceeded"),
        ];

        ResultStore::save(&papers, &path).unwrap();
        let loaded = ResultStore::load(&path).unwrap();
        assert_eq!(loaded, papers);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Résumé of φ-fields"));
        assert!(raw.contains("李小龙"));
        assert!(!raw.contains("\\u"));
        assert!(raw.contains("\n  {\n    \"title\""));
        assert!(raw.contains("\"analysis\": \"Error: quota exceeded\""));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        ResultStore::save(&[record("1", "A"), record("2", "B")], &path).unwrap();
        ResultStore::save(&[record("3", "C")], &path).unwrap();
        let loaded = ResultStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "3");
    }

    #[test]
    fn test_save_creates_parent_dirs_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out").join("results.json");
        ResultStore::save(&[record("1", "A")], &path).unwrap();
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_save_leaves_same_stem_siblings_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let notes = dir.path().join("results.tmp");
        let csv = dir.path().join("results.csv");
        std::fs::write(&notes, "operator notes").unwrap();
        std::fs::write(&csv, "id,title\n").unwrap();

        ResultStore::save(&[record("1", "A")], &path).unwrap();

        assert_eq!(std::fs::read_to_string(&notes).unwrap(), "operator notes");
        assert_eq!(std::fs::read_to_string(&csv).unwrap(), "id,title\n");
        assert_eq!(ResultStore::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("out/results.json")),
            PathBuf::from("out/results.json.tmp")
        );
        assert_eq!(tmp_path(Path::new("notes")), PathBuf::from("notes.tmp"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ResultStore::load(&dir.path().join("absent.json")).unwrap_err();
        match err {
            PaperlensError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_json_nonexistent() {
        let dir = TempDir::new().unwrap();
        let result: Option<Vec<u32>> = load_json(&dir.path().join("nope.json")).unwrap();
        assert!(result.is_none());
    }
}
