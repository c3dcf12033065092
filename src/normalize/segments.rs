//! Splits text into prose and math spans.
//!
//! Recognised openers are `$$`, `$`, `\[` and `\(`, each only when not
//! escaped by an odd run of backslashes. All delimiters are ASCII, so every
//! offset produced here is a char boundary.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Inline(&'a str),
    Display(&'a str),
    /// A `\(..\)` or `\[..\]` span. Its body may hold unescaped dollars
    /// that have no partner inside it.
    Legacy { body: &'a str, display: bool },
    /// A `$` or `$$` opener with no closing partner
    Unmatched(&'a str),
}

pub(crate) fn write_math(out: &mut String, math: &str, display: bool) {
    let delimiter = if display { "$$" } else { "$" };
    out.push_str(delimiter);
    out.push_str(math);
    out.push_str(delimiter);
}

pub(crate) fn write_legacy(out: &mut String, math: &str, display: bool) {
    let (open, close) = if display { ("\\[", "\\]") } else { ("\\(", "\\)") };
    out.push_str(open);
    out.push_str(math);
    out.push_str(close);
}

pub(crate) fn split(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'\\').count();
                let next = i + run;
                if run % 2 == 0 || next >= bytes.len() {
                    i = next;
                    continue;
                }

                let (closer, display) = match bytes[next] {
                    b'(' => ("\\)", false),
                    b'[' => ("\\]", true),
                    // any other escaped char, including `\$`
                    _ => {
                        i = next + 1;
                        continue;
                    }
                };

                let open = next - 1;
                let body_start = next + 1;
                match find_unescaped(bytes, body_start, closer.as_bytes()) {
                    Some(close) if is_legacy_body(&bytes[body_start..close]) => {
                        push_text(&mut segments, text, text_start, open);
                        segments.push(Segment::Legacy {
                            body: &text[body_start..close],
                            display,
                        });
                        i = close + closer.len();
                        text_start = i;
                    }
                    _ => i = body_start,
                }
            }
            b'$' => {
                let display = bytes.get(i + 1) == Some(&b'$');
                let opener = if display { 2 } else { 1 };
                let closer: &[u8] = if display { b"$$" } else { b"$" };

                push_text(&mut segments, text, text_start, i);
                match find_unescaped(bytes, i + opener, closer) {
                    Some(close) => {
                        let body = &text[i + opener..close];
                        segments.push(if display {
                            Segment::Display(body)
                        } else {
                            Segment::Inline(body)
                        });
                        i = close + closer.len();
                    }
                    None => {
                        segments.push(Segment::Unmatched(&text[i..i + opener]));
                        i += opener;
                    }
                }
                text_start = i;
            }
            _ => i += 1,
        }
    }

    push_text(&mut segments, text, text_start, bytes.len());
    segments
}

fn push_text<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str, start: usize, end: usize) {
    if end > start {
        segments.push(Segment::Text(&text[start..end]));
    }
}

/// Position of the first unescaped `needle` at or after `from`
fn find_unescaped(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    let mut k = from;
    while k < bytes.len() {
        if bytes[k..].starts_with(needle) {
            return Some(k);
        }
        // a backslash always consumes the byte after it
        k += if bytes[k] == b'\\' { 2 } else { 1 };
    }
    None
}

/// A legacy span is math only when it is non-blank and holds no complete
/// `$..$` or `$$..$$` span of its own. Lone dollars inside it are allowed.
fn is_legacy_body(body: &[u8]) -> bool {
    !body.iter().all(u8::is_ascii_whitespace) && !has_dollar_pair(body)
}

fn has_dollar_pair(body: &[u8]) -> bool {
    let mut k = 0;
    while k < body.len() {
        match body[k] {
            b'\\' => k += 2,
            b'$' => {
                let (opener, closer): (usize, &[u8]) = if body.get(k + 1) == Some(&b'$') {
                    (2, b"$$")
                } else {
                    (1, b"$")
                };
                if find_unescaped(body, k + opener, closer).is_some() {
                    return true;
                }
                k += opener;
            }
            _ => k += 1,
        }
    }
    false
}

/// Escape every unescaped `$` in `body`.
pub(crate) fn escape_dollars(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 4);
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '$' => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out
}
