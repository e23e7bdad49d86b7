/// Search hit highlighting
///
/// With a simple search active, each rendered cell carries the byte ranges
/// the search pattern matched in its text. Renderers wrap those ranges in
/// whatever marker they use.
use crate::pattern::WildcardPattern;
use regex::Regex;
use serde::Serialize;

/// Byte range of one hit within a cell's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct Highlighter {
    regex: Regex,
}

impl Highlighter {
    /// A highlighter for `pattern`; `None` for the match-everything pattern,
    /// which has nothing to mark.
    pub fn from_pattern(pattern: &WildcardPattern) -> Option<Self> {
        pattern.regex().map(|re| Highlighter { regex: re.clone() })
    }

    /// Regex source, reported to renderers alongside the spans. Carries the
    /// `(?i)` flag so that recompiling it matches the same text.
    pub fn pattern(&self) -> String {
        format!("(?i){}", self.regex.as_str())
    }

    /// Every non-empty hit in `text`, left to right.
    pub fn spans(&self, text: &str) -> Vec<HighlightSpan> {
        self.regex
            .find_iter(text)
            .filter(|m| !m.is_empty())
            .map(|m| HighlightSpan {
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }

    /// `text` with every hit wrapped in `open`/`close`.
    pub fn mark(&self, text: &str, open: &str, close: &str) -> String {
        mark_spans(text, &self.spans(text), open, close)
    }
}

/// Wrap the given byte ranges of `text` in `open`/`close`.
///
/// Spans are applied left to right. A span that is empty, overlaps an earlier
/// one, or does not fall on character boundaries within `text` is skipped.
pub fn mark_spans(text: &str, spans: &[HighlightSpan], open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * (open.len() + close.len()));
    let mut last = 0;
    for span in spans {
        if span.start < last || span.start >= span.end {
            continue;
        }
        let (Some(before), Some(hit)) = (text.get(last..span.start), text.get(span.start..span.end)) else {
            continue;
        };
        out.push_str(before);
        out.push_str(open);
        out.push_str(hit);
        out.push_str(close);
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}
