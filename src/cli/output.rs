//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print document info.
    pub fn document_info(filename: &str, chunks: u32) {
        println!(
            "  {} {} ({} chunks)",
            style("*").cyan(),
            style(filename).bold(),
            chunks
        );
    }

    /// Print search result.
    pub fn search_result(filename: &str, page_number: u32, score: f32, content: &str) {
        println!(
            "\n{} {} p. {} (score: {:.2})",
            style(">>").green(),
            style(filename).bold(),
            style(page_number).cyan(),
            score
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_len: usize) -> String {
    let content = content.replace('\n', " ");
    if content.len() <= max_len {
        content
    } else {
        let mut end = max_len;
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &content[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview_short() {
        assert_eq!(content_preview("short", 10), "short");
    }

    #[test]
    fn test_content_preview_truncates() {
        let preview = content_preview(&"x".repeat(300), 200);
        assert_eq!(preview.len(), 203);
        assert!(preview.ends_with("..."));
    }
}
