//! Stage 5: whitespace and character cleanup.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"(?:\r?\n){3,}").unwrap();
}

/// Characters the renderer accepts: ASCII plus the rest of the BMP above the
/// C1 control block.
pub fn is_renderable(c: char) -> bool {
    let code = c as u32;
    code <= 0x7F || (0xA0..=0xFFFF).contains(&code)
}

pub fn strip_unrenderable(text: &str) -> String {
    text.chars().filter(|&c| is_renderable(c)).collect()
}

pub fn cleanup(text: &str) -> String {
    let stripped = strip_unrenderable(text);
    EXCESS_NEWLINES.replace_all(&stripped, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_newlines() {
        assert_eq!(cleanup("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(cleanup("a\r\n\r\n\r\nb"), "a\n\nb");
        assert_eq!(cleanup("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_strip_unrenderable() {
        assert_eq!(cleanup("ok 🎉 done"), "ok  done");
        assert_eq!(cleanup("a\u{0085}b"), "ab");
        assert_eq!(cleanup("ħω ≈ ψ"), "ħω ≈ ψ");
    }

    #[test]
    fn test_idempotent() {
        let once = cleanup("x\n\n\n\n🧠y");
        assert_eq!(cleanup(&once), once);
    }
}
