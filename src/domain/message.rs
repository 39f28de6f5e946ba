use std::fmt;

/// Boilerplate that chat models like to put in front of the actual message.
const UNWANTED_PREFIXES: &[&str] = &[
    "Sure! ",
    "Here's a commit message:",
    "Example:",
    "Generated commit message:",
    "Here is a commit message:",
    "A possible commit message:",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage(String);

impl CommitMessage {
    /// Cleans up a raw model response. Returns `None` when nothing usable is left.
    pub fn from_generated(raw: &str) -> Option<Self> {
        let mut message = raw.trim();
        for prefix in UNWANTED_PREFIXES {
            if let Some(rest) = message.strip_prefix(prefix) {
                message = rest.trim();
            }
        }
        let message = strip_wrapping_quotes(message).trim();

        if message.is_empty() {
            None
        } else {
            Some(Self(message.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drops one quote pair only when the opening quote is closed by the last
/// character, so `'feat' and 'fix'` is left as is.
fn strip_wrapping_quotes(input: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        let inner = input
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote));
        if let Some(inner) = inner {
            if !inner.contains(quote) {
                return inner;
            }
        }
    }
    input
}
