//! Terminal rendering for papers and generated text.

use paperlens_core::PaperRecord;

const WRAP_WIDTH: usize = 100;
const RULE_WIDTH: usize = 80;
const LISTED_AUTHORS: usize = 3;

pub fn banner(title: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("{}\n{}\n{}", rule, title, rule)
}

/// Wrap long lines; existing line breaks are kept.
pub fn wrapped(text: &str) -> String {
    textwrap::fill(text, WRAP_WIDTH)
}

/// One numbered entry of a search listing.
pub fn paper_listing(index: usize, paper: &PaperRecord) -> String {
    let shown: Vec<&str> = paper
        .authors
        .iter()
        .take(LISTED_AUTHORS)
        .map(String::as_str)
        .collect();
    let more = if paper.authors.len() > LISTED_AUTHORS {
        "..."
    } else {
        ""
    };
    format!(
        "{}. {}\n   Authors: {}{}\n   Published: {}\n   ID: {}\n",
        index,
        paper.title,
        shown.join(", "),
        more,
        paper.published.format("%Y-%m-%d"),
        paper.id,
    )
}

/// A labelled block of generated text.
pub fn section(label: &str, text: &str) -> String {
    format!("\n{}:\n{}\n", label, wrapped(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paper_listing_truncates_authors() {
        let mut paper = PaperRecord::new("2401.00001v1", "A Paper");
        paper.authors = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            paper_listing(1, &paper),
            "1. A Paper\n   Authors: A, B, C...\n   Published: 1970-01-01\n   ID: 2401.00001v1\n"
        );
    }

    #[test]
    fn test_paper_listing_short_author_list() {
        let mut paper = PaperRecord::new("x", "T");
        paper.authors = vec!["Solo".to_string()];
        assert!(paper_listing(2, &paper).contains("Authors: Solo\n"));
    }

    #[test]
    fn test_wrapped_keeps_line_breaks() {
        let text = format!("1. {}\n2. short", "word ".repeat(40));
        let out = wrapped(&text);
        assert!(out.lines().all(|l| l.chars().count() <= WRAP_WIDTH));
        assert!(out.ends_with("2. short"));
    }

    #[test]
    fn test_banner() {
        let b = banner("Comparing papers...");
        assert_eq!(b.lines().count(), 3);
        assert_eq!(b.lines().next().unwrap().len(), RULE_WIDTH);
    }
}
