//! Markdown-to-safe-HTML conversion for the analysis narrative.
//!
//! The narrative comes from the model and may echo candidate document content,
//! so every byte of it is escaped before any tag is introduced. Steps run in a
//! fixed order:
//! 1. escape `&`, `<`, `>`
//! 2. `**bold**` then `*italic*`
//! 3. `###` / `##` / `#` headings
//! 4. `N. item` runs → `<ol>`
//! 5. `- item` / `• item` runs → `<ul>`
//! 6. remaining newlines → `<br>`
//!
//! Newlines adjacent to a heading or list container are absorbed by the block
//! element and do not produce `<br>`.

use std::sync::LazyLock;

use regex::Regex;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("Invalid bold regex"));

static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("Invalid italic regex"));

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\. (.+)$").expect("Invalid numbered list regex"));

static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-•] (.+)$").expect("Invalid bullet list regex"));

/// Escapes the three HTML metacharacters. `&` goes first so the entities
/// produced for `<` and `>` are not escaped again.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Converts the model's lightweight markdown into an HTML fragment.
pub fn format_markdown_to_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let normalized = text.replace("\r\n", "\n");
    let escaped = escape_html(&normalized);
    let bolded = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    let emphasized = ITALIC.replace_all(&bolded, "<em>$1</em>");

    let blocks: Vec<Block> = emphasized.split('\n').map(classify_line).collect();
    render_blocks(&blocks)
}

#[derive(Debug, PartialEq)]
enum Block {
    Heading { level: u8, text: String },
    OrderedItem(String),
    UnorderedItem(String),
    Line(String),
}

fn classify_line(line: &str) -> Block {
    // Longest prefix first so `###` is not read as `#`.
    for (prefix, level) in [("### ", 4), ("## ", 3), ("# ", 2)] {
        if let Some(rest) = line.strip_prefix(prefix) {
            if !rest.is_empty() {
                return Block::Heading {
                    level,
                    text: rest.to_string(),
                };
            }
        }
    }
    if let Some(caps) = NUMBERED_ITEM.captures(line) {
        return Block::OrderedItem(caps[1].to_string());
    }
    if let Some(caps) = BULLET_ITEM.captures(line) {
        return Block::UnorderedItem(caps[1].to_string());
    }
    Block::Line(line.to_string())
}

fn render_blocks(blocks: &[Block]) -> String {
    let mut html = String::new();
    // Whether the previous emitted piece was block-level (heading or list).
    let mut after_block = true;
    let mut index = 0;

    while index < blocks.len() {
        match &blocks[index] {
            Block::Heading { level, text } => {
                html.push_str(&format!("<h{level}>{text}</h{level}>"));
                after_block = true;
                index += 1;
            }
            Block::OrderedItem(_) | Block::UnorderedItem(_) => {
                let ordered = matches!(blocks[index], Block::OrderedItem(_));
                let tag = if ordered { "ol" } else { "ul" };
                html.push_str(&format!("<{tag}>"));
                while let Some(item) = blocks.get(index).and_then(|b| list_item(b, ordered)) {
                    html.push_str(&format!("<li>{item}</li>"));
                    index += 1;
                }
                html.push_str(&format!("</{tag}>"));
                after_block = true;
            }
            Block::Line(text) => {
                if !after_block {
                    html.push_str("<br>");
                }
                html.push_str(text);
                after_block = false;
                index += 1;
            }
        }
    }

    html
}

fn list_item(block: &Block, ordered: bool) -> Option<&str> {
    match (block, ordered) {
        (Block::OrderedItem(text), true) | (Block::UnorderedItem(text), false) => Some(text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_empty_output() {
        assert_eq!(format_markdown_to_html(""), "");
    }

    #[test]
    fn test_bold_has_no_raw_asterisks() {
        let html = format_markdown_to_html("**bold**");
        assert_eq!(html, "<strong>bold</strong>");
        assert!(!html.contains('*'));
    }

    #[test]
    fn test_bold_before_italic() {
        assert_eq!(
            format_markdown_to_html("**Score:** *high*"),
            "<strong>Score:</strong> <em>high</em>"
        );
    }

    #[test]
    fn test_script_tag_is_escaped() {
        let html = format_markdown_to_html("<script>alert('x')</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_ampersand_escaped_once() {
        assert_eq!(format_markdown_to_html("R&D <b>"), "R&amp;D &lt;b&gt;");
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_markup_inside_emphasis_stays_escaped() {
        let html = format_markdown_to_html("**<img src=x onerror=alert(1)>**");
        assert_eq!(html, "<strong>&lt;img src=x onerror=alert(1)&gt;</strong>");
    }

    #[test]
    fn test_heading_levels() {
        let html = format_markdown_to_html("# Top\n## Candidate 1\n### Notes");
        assert_eq!(html, "<h2>Top</h2><h3>Candidate 1</h3><h4>Notes</h4>");
    }

    #[test]
    fn test_heading_only_at_line_start() {
        assert_eq!(format_markdown_to_html("see ## not heading"), "see ## not heading");
    }

    #[test]
    fn test_numbered_run_wrapped_in_ol() {
        let html = format_markdown_to_html("1. First\n2. Second");
        assert_eq!(html, "<ol><li>First</li><li>Second</li></ol>");
    }

    #[test]
    fn test_bullet_runs_wrapped_in_ul() {
        let html = format_markdown_to_html("**Key Strengths:**\n- Rust\n• Kafka\nDone");
        assert_eq!(
            html,
            "<strong>Key Strengths:</strong><ul><li>Rust</li><li>Kafka</li></ul>Done"
        );
    }

    #[test]
    fn test_ordered_and_unordered_runs_stay_separate() {
        let html = format_markdown_to_html("1. Ask about Rust\n- Gap: Kubernetes");
        assert_eq!(
            html,
            "<ol><li>Ask about Rust</li></ol><ul><li>Gap: Kubernetes</li></ul>"
        );
    }

    #[test]
    fn test_plain_newlines_become_br() {
        assert_eq!(format_markdown_to_html("line one\nline two"), "line one<br>line two");
        assert_eq!(format_markdown_to_html("a\r\n\r\nb"), "a<br><br>b");
    }

    #[test]
    fn test_full_narrative_shape() {
        let narrative = "## Analysis Overview\nStrong pool.\n\n## Candidate 1: alice.pdf\n**AI Match Score:** 92%\n- Led <team>\n";
        let html = format_markdown_to_html(narrative);
        assert!(html.starts_with("<h3>Analysis Overview</h3>Strong pool.<br>"));
        assert!(html.contains("<h3>Candidate 1: alice.pdf</h3>"));
        assert!(html.contains("<strong>AI Match Score:</strong> 92%"));
        assert!(html.contains("<ul><li>Led &lt;team&gt;</li></ul>"));
    }
}
