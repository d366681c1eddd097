//! Turning a model completion back into a commit message.

use std::fmt;

use crate::llm::prompts::TAG_COMMIT_MESSAGE;

/// A commit message extracted from one completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedMessage {
    pub subject: String,
    pub body: String,
}

impl GeneratedMessage {
    pub fn is_empty(&self) -> bool {
        self.subject.is_empty() && self.body.is_empty()
    }
}

/// Renders as a commit message: subject, blank line, body.
impl fmt::Display for GeneratedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}", self.subject)
        } else {
            write!(f, "{}\n\n{}", self.subject, self.body)
        }
    }
}

/// Result of looking for a tagged block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatch {
    Found { subject: String, body: String },
    NotFound,
}

/// Which extraction the caller expects to work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Look for a `<commit-message>` block, fall back to line splitting.
    Tagged,
    /// No tags were requested: first line is the subject.
    Plain,
}

/// A case-insensitive `<name>` … `</name>` matcher.
#[derive(Debug, Clone, Copy)]
pub struct TaggedBlock<'a> {
    name: &'a str,
}

impl<'a> TaggedBlock<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name }
    }

    /// Inner text of the last closed `<name>…</name>` pair in `text`.
    ///
    /// Without any closed pair, the last opening tag runs to the end of the
    /// text (the model stopped before closing it).
    pub fn inner<'t>(&self, text: &'t str) -> Option<&'t str> {
        // ASCII lowering keeps byte offsets aligned with `text`.
        let haystack = text.to_ascii_lowercase();
        let open = format!("<{}>", self.name.to_ascii_lowercase());
        let close = format!("</{}>", self.name.to_ascii_lowercase());

        let mut search_end = haystack.len();
        while let Some(end) = haystack[..search_end].rfind(&close) {
            if let Some(start) = haystack[..end].rfind(&open) {
                return Some(&text[start + open.len()..end]);
            }
            search_end = end;
        }

        let start = haystack.rfind(&open)? + open.len();
        Some(&text[start..])
    }

    pub fn extract(&self, text: &str) -> TagMatch {
        match self.inner(text) {
            Some(inner) => {
                let (subject, body) = split_first_line(inner.trim());
                TagMatch::Found { subject, body }
            }
            None => TagMatch::NotFound,
        }
    }
}

/// Parse a completion. `Tagged` never fails: without a block it falls back
/// to the first non-empty line as subject.
pub fn parse_with(strategy: ParseStrategy, completion: &str) -> GeneratedMessage {
    match strategy {
        ParseStrategy::Tagged => match TaggedBlock::new(TAG_COMMIT_MESSAGE).extract(completion) {
            TagMatch::Found { subject, body } => GeneratedMessage { subject, body },
            TagMatch::NotFound => {
                log::debug!("No <{TAG_COMMIT_MESSAGE}> block in completion, using line fallback");
                parse_lines(completion)
            }
        },
        ParseStrategy::Plain => {
            let (subject, body) = split_first_line(completion.trim());
            GeneratedMessage { subject, body }
        }
    }
}

/// First non-empty line is the subject, the other non-empty lines the body.
fn parse_lines(completion: &str) -> GeneratedMessage {
    let mut lines = completion.lines().map(str::trim_end).filter(|l| !l.trim().is_empty());
    let subject = lines.next().map(|l| l.trim().to_string()).unwrap_or_default();
    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    GeneratedMessage { subject, body }
}

fn split_first_line(text: &str) -> (String, String) {
    match text.split_once('\n') {
        Some((first, rest)) => (first.trim().to_string(), rest.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}
