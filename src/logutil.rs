//! Helpers for logging player-supplied text (command lines, display names) on one line.

use std::borrow::Cow;

const MAX_LOGGED_CHARS: usize = 160;

/// Make `text` safe for a single log line.
///
/// Control characters are written as escapes (`\n`, `\t`, `\u{1b}`) and anything past
/// [`MAX_LOGGED_CHARS`] characters is cut off with an ellipsis. Clean short input is
/// returned borrowed.
pub fn log_safe(text: &str) -> Cow<'_, str> {
    let clean = text.chars().count() <= MAX_LOGGED_CHARS && !text.chars().any(char::is_control);
    if clean {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len().min(MAX_LOGGED_CHARS * 2));
    for (idx, ch) in text.chars().enumerate() {
        if idx == MAX_LOGGED_CHARS {
            out.push('…');
            break;
        }
        if ch.is_control() {
            out.extend(ch.escape_default());
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

/// First line of a multi-line narrative, for compact outcome logging.
pub fn headline(narrative: &str) -> Cow<'_, str> {
    log_safe(narrative.lines().next().unwrap_or(""))
}
