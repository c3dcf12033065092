//! Stage 3: delimiter normalization.
//!
//! Invariant on output: every math span uses `$...$` or `$$...$$`, every
//! balanced matrix environment sits inside a `$$` span, and no `$` is left
//! without a partner.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

use super::segments::{self, Segment};

lazy_static! {
    static ref MATRIX_ENV: Regex =
        Regex::new(r"\\(begin|end)\{([pbBvV]?matrix)\}").unwrap();
}

const PADDING: &[char] = &[' ', '\t', '\r', '\n'];

pub fn normalize_delimiters(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    // Prose between math spans, with lone dollars already escaped, so a
    // matrix around a stray `$` is still seen as one environment.
    let mut prose = String::new();

    for segment in segments::split(text) {
        let (math, display) = match segment {
            Segment::Text(raw) => {
                prose.push_str(raw);
                continue;
            }
            Segment::Unmatched(dollars) => {
                for _ in dollars.chars() {
                    prose.push_str("\\$");
                }
                continue;
            }
            Segment::Inline(math) => (Cow::Borrowed(math), false),
            Segment::Display(math) => (Cow::Borrowed(math), true),
            Segment::Legacy { body, display } => {
                (Cow::Owned(segments::escape_dollars(body)), display)
            }
        };

        wrap_bare_matrices(&prose, &mut out);
        prose.clear();
        write_math_span(&mut out, &math, display);
    }

    wrap_bare_matrices(&prose, &mut out);
    out
}

/// Math holding a matrix is always written in display mode.
fn write_math_span(out: &mut String, math: &str, display: bool) {
    if !display && matrix_spans(math).is_empty() {
        segments::write_math(out, math, false);
    } else {
        segments::write_math(out, &tidy_matrices(math), true);
    }
}

/// Byte ranges of outermost balanced matrix environments in `text`.
///
/// Stops at the first mismatched `\end` or unclosed `\begin`; whatever
/// follows is left untouched.
fn matrix_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Vec<&str> = Vec::new();
    let mut start = 0;

    for caps in MATRIX_ENV.captures_iter(text) {
        let (Some(whole), Some(kind), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };

        // `\\begin` is a row break followed by a word, not an environment
        if is_escaped(text, whole.start()) {
            continue;
        }

        if kind.as_str() == "begin" {
            if open.is_empty() {
                start = whole.start();
            }
            open.push(name.as_str());
            continue;
        }

        match open.pop() {
            Some(expected) if expected == name.as_str() => {
                if open.is_empty() {
                    spans.push((start, whole.end()));
                }
            }
            // stray `\end` outside any environment
            None => continue,
            Some(_) => break,
        }
    }

    spans
}

/// Whether the byte at `pos` is preceded by an odd run of backslashes
fn is_escaped(text: &str, pos: usize) -> bool {
    text.as_bytes()[..pos]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count()
        % 2
        == 1
}

fn wrap_bare_matrices(prose: &str, out: &mut String) {
    let mut last = 0;
    for (start, end) in matrix_spans(prose) {
        out.push_str(&prose[last..start]);
        segments::write_math(out, &tidy_matrix(&prose[start..end]), true);
        last = end;
    }
    out.push_str(&prose[last..]);
}

fn tidy_matrices(math: &str) -> String {
    let mut out = String::with_capacity(math.len() + 8);
    let mut last = 0;
    for (start, end) in matrix_spans(math) {
        out.push_str(&math[last..start]);
        out.push_str(&tidy_matrix(&math[start..end]));
        last = end;
    }
    out.push_str(&math[last..]);
    out
}

/// Pad row separators to ` \\ ` and column separators to ` & `.
///
/// A backslash run of length `n` holds `n / 2` row separators; an odd run
/// ends in a single escape for whatever follows. An escaped `\&` becomes a
/// plain column separator.
fn tidy_matrix(env: &str) -> String {
    let mut out = String::with_capacity(env.len() + 16);
    let mut rest = env;

    while let Some(pos) = rest.find(['\\', '&']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with('&') {
            push_column_separator(&mut out);
            rest = tail[1..].trim_start_matches(PADDING);
            continue;
        }

        let run = tail.bytes().take_while(|&b| b == b'\\').count();
        let after = &tail[run..];
        let rows = run / 2;
        let escape = run % 2 == 1;

        if rows > 0 {
            trim_padding(&mut out);
            for _ in 0..rows {
                out.push_str(" \\\\");
            }
        }

        if escape && after.starts_with('&') {
            push_column_separator(&mut out);
            rest = after[1..].trim_start_matches(PADDING);
        } else if escape {
            if rows > 0 {
                out.push(' ');
            }
            out.push('\\');
            rest = after;
        } else {
            out.push(' ');
            rest = after.trim_start_matches(PADDING);
        }
    }

    out.push_str(rest);
    out
}

fn push_column_separator(out: &mut String) {
    trim_padding(out);
    out.push_str(" & ");
}

fn trim_padding(out: &mut String) {
    let trimmed = out.trim_end_matches(PADDING).len();
    out.truncate(trimmed);
}
