use scraper::{Html, Node};

use super::sources::FeedEntry;

const DEFAULT_TITLE: &str = "Untitled";
const SUMMARY_LIMIT: usize = 300;
const ELLIPSIS: &str = "...";
const SUMMARY_CUT: usize = SUMMARY_LIMIT - ELLIPSIS.len();

const BLOCK_ELEMENTS: &[&str] = &[
    "br", "p", "div", "li", "ul", "ol", "blockquote", "tr", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Renders an entry as a Telegram HTML message: bold title, link, and an
/// optional plain-text summary.
pub fn format_entry(entry: &FeedEntry) -> String {
    let title = entry
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE);
    let link = entry.link.as_deref().unwrap_or_default().trim();

    let mut message = format!("<b>{}</b>\n{}", escape_html(title), escape_html(link));

    let plain = entry.summary.as_deref().map(strip_markup).unwrap_or_default();
    if !plain.is_empty() {
        message.push_str("\n\n");
        message.push_str(&escape_html(&truncate_summary(&plain)));
    }

    message
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Drops all tags and keeps only text content (entities decoded). Block-level
/// elements start a new line so adjacent paragraphs don't run together.
pub fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => {
                if !out.is_empty() && !out.ends_with(char::is_whitespace) {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }

    out.trim().to_string()
}

/// Caps `text` at 300 characters, cutting on a word boundary and appending an
/// ellipsis. Text within the limit is returned unchanged.
pub fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= SUMMARY_LIMIT {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(SUMMARY_CUT)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];

    let cut_on_boundary = text[cut..].chars().next().is_none_or(char::is_whitespace);
    let head = if cut_on_boundary {
        head
    } else {
        head.rfind(char::is_whitespace)
            // single oversized word: no boundary to back off to
            .map_or(head, |i| &head[..i])
    };

    format!("{}{ELLIPSIS}", head.trim_end())
}
