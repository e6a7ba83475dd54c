//! Splits assistant replies into Markdown prose and Mermaid diagrams.

use std::sync::LazyLock;

use regex::Regex;

static MERMAID_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```mermaid[ \t]*\r?\n(.*?)```").ok());

/// One piece of a reply, in reply order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Prose to render as Markdown.
    Markdown(String),
    /// The body of a fenced `mermaid` block, without the fences.
    Mermaid(String),
}

impl Segment {
    pub fn is_mermaid(&self) -> bool {
        matches!(self, Segment::Mermaid(_))
    }
}

/// Split a reply into Markdown and Mermaid segments.
///
/// Markdown runs that are empty or all whitespace are dropped.
pub fn split_segments(text: &str) -> Vec<Segment> {
    let Some(regex) = MERMAID_BLOCK.as_ref() else {
        return vec![Segment::Markdown(text.to_string())];
    };
    let mut segments = Vec::new();
    let mut last = 0;
    for captures in regex.captures_iter(text) {
        let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        push_markdown(&mut segments, &text[last..whole.start()]);
        segments.push(Segment::Mermaid(body.as_str().trim_end().to_string()));
        last = whole.end();
    }
    push_markdown(&mut segments, &text[last..]);
    segments
}

fn push_markdown(segments: &mut Vec<Segment>, text: &str) {
    if !text.trim().is_empty() {
        segments.push(Segment::Markdown(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_segment() {
        assert_eq!(
            split_segments("Just **prose**."),
            vec![Segment::Markdown("Just **prose**.".to_string())]
        );
    }

    #[test]
    fn empty_reply_has_no_segments() {
        assert!(split_segments("  \n").is_empty());
    }

    #[test]
    fn diagram_between_prose() {
        let reply = "Here is the flow:\n```mermaid\ngraph TD\n  A --> B\n```\nThat's it.";
        assert_eq!(
            split_segments(reply),
            vec![
                Segment::Markdown("Here is the flow:\n".to_string()),
                Segment::Mermaid("graph TD\n  A --> B".to_string()),
                Segment::Markdown("\nThat's it.".to_string()),
            ]
        );
    }

    #[test]
    fn adjacent_diagrams() {
        let reply = "```mermaid\ngraph LR\n```\n```mermaid\npie\n```";
        let segments = split_segments(reply);
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(Segment::is_mermaid));
    }

    #[test]
    fn other_fences_stay_markdown() {
        let reply = "```rust\nfn main() {}\n```";
        assert_eq!(
            split_segments(reply),
            vec![Segment::Markdown(reply.to_string())]
        );
    }
}
