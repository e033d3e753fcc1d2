use std::borrow::Cow;

/// Two-character escape sequences left behind by double-encoded source records.
const LITERAL_ESCAPES: [&str; 3] = ["\\t", "\\r", "\\n"];

/// Characters that would break a tab/newline-delimited row. U+F076 is a private-use
/// glyph some records carry as a mis-encoded bullet.
const CONTROL_CHARS: [char; 5] = ['\t', '\r', '\n', '\u{8}', '\u{f076}'];

/// Makes text safe for tab-delimited storage by replacing each literal escape sequence
/// and each delimiter-breaking character with a single space.
///
/// Everything else is left alone; non-Latin scripts in titles and names survive intact.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    let has_escape = LITERAL_ESCAPES.iter().any(|esc| text.contains(esc));
    let has_control = text.contains(CONTROL_CHARS.as_slice());
    if !has_escape && !has_control {
        return Cow::Borrowed(text);
    }

    let mut out = text.to_string();
    if has_escape {
        for esc in LITERAL_ESCAPES {
            if out.contains(esc) {
                out = out.replace(esc, " ");
            }
        }
    }
    Cow::Owned(out.replace(CONTROL_CHARS.as_slice(), " "))
}

/// Prepares a raw JSON payload for parsing: drops the line terminator and replaces raw
/// CR, LF and backspace bytes, which are illegal inside JSON strings.
pub fn clean_payload(raw: &str) -> Cow<'_, str> {
    let trimmed = raw.trim_end_matches(['\n', '\r']);
    if trimmed.contains(['\r', '\n', '\u{8}']) {
        Cow::Owned(trimmed.replace(['\r', '\n', '\u{8}'], " "))
    } else {
        Cow::Borrowed(trimmed)
    }
}
