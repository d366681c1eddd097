use crate::message::GeneratedMessage;

const SHORT_SUBJECT_CHARS: usize = 50;
const KEYWORDS: [&str; 8] = [
    "fix", "feature", "refactor", "update", "improve", "add", "remove", "change",
];

/// Advisory score in `[0, 1]` for a parsed message. Never used to reject one.
pub fn score(message: &GeneratedMessage) -> f64 {
    let subject = message.subject.trim();
    let mut total = 0.0;

    if !subject.is_empty() && subject.chars().count() <= SHORT_SUBJECT_CHARS {
        total += 0.5;
    }
    if !message.body.trim().is_empty() {
        total += 0.3;
    }
    let lowered = subject.to_lowercase();
    if KEYWORDS.iter().any(|k| lowered.contains(k)) {
        total += 0.2;
    }

    f64::clamp(total, 0.0, 1.0)
}
