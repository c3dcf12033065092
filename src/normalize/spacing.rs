//! Stage 4: cosmetic spacing inside math spans. Prose and delimiters are
//! written back as found.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::segments::{self, Segment};

lazy_static! {
    static ref BRA_KET: Regex = Regex::new(r"(?s)\\langle(.*?)\\rangle").unwrap();
    static ref SPACE_AFTER_SCRIPT: Regex = Regex::new(r"([_^])[ \t]+\{").unwrap();
    static ref SPACE_BEFORE_SCRIPT: Regex =
        Regex::new(r"([A-Za-z0-9}\)\]])[ \t]+([_^]\{)").unwrap();
}

/// Bra-ket contents that make the bracket structure ambiguous
const BRA_KET_UNSAFE: &[&str] = &[r"\langle", r"\begin", r"\end", r"\left", r"\right", r"\|", r"\\", "&"];

pub fn normalize_spacing(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments::split(text) {
        match segment {
            Segment::Inline(math) => segments::write_math(&mut out, &space_math(math), false),
            Segment::Display(math) => segments::write_math(&mut out, &space_math(math), true),
            Segment::Legacy { body, display } => {
                segments::write_legacy(&mut out, &space_math(body), display)
            }
            Segment::Text(raw) | Segment::Unmatched(raw) => out.push_str(raw),
        }
    }
    out
}

fn space_math(math: &str) -> String {
    let spaced = BRA_KET.replace_all(math, |caps: &Captures| space_bra_ket(caps, math));
    let spaced = SPACE_AFTER_SCRIPT.replace_all(&spaced, "${1}{");
    SPACE_BEFORE_SCRIPT
        .replace_all(&spaced, "${1}${2}")
        .into_owned()
}

/// `\langle a|H |b\rangle` becomes `\langle a | H | b \rangle`.
fn space_bra_ket(caps: &Captures, math: &str) -> String {
    let whole = &caps[0];
    let inner = &caps[1];

    // `\langlex` or `\ranglex` is some other command name
    let after = caps.get(0).map_or(math.len(), |m| m.end());
    if starts_with_letter(inner) || starts_with_letter(&math[after..]) {
        return whole.to_string();
    }

    if BRA_KET_UNSAFE.iter().any(|token| inner.contains(token)) {
        return whole.to_string();
    }

    let parts: Vec<&str> = inner.split('|').map(str::trim).collect();
    if parts.iter().all(|part| part.is_empty()) || parts.iter().any(|part| part.ends_with('\\')) {
        return whole.to_string();
    }

    format!(r"\langle {} \rangle", parts.join(" | "))
}

fn starts_with_letter(text: &str) -> bool {
    text.bytes().next().is_some_and(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bra_ket_spacing() {
        assert_eq!(
            normalize_spacing(r"$\langle\psi_{1}|\hat{H}|\psi_{2}\rangle$"),
            r"$\langle \psi_{1} | \hat{H} | \psi_{2} \rangle$"
        );
        assert_eq!(
            normalize_spacing(r"$$\langle   a|b  \rangle$$"),
            r"$$\langle a | b \rangle$$"
        );
        assert_eq!(normalize_spacing(r"$\langle x\rangle$"), r"$\langle x \rangle$");
    }

    #[test]
    fn test_ambiguous_bra_ket_left_alone() {
        for input in [
            r"$\langle \begin{pmatrix}1\end{pmatrix} | a\rangle$",
            r"$\langle a \langle b\rangle$",
            r"$\langle a \| b\rangle$",
            r"$\langle\rangle$",
            r"$\langlea|b\rangle$",
            r"$\langle a|b\ranglex$",
        ] {
            assert_eq!(normalize_spacing(input), input);
        }
    }

    #[test]
    fn test_script_spacing() {
        assert_eq!(normalize_spacing(r"$x _ {n} + y ^ {2}$"), r"$x_{n} + y^{2}$");
        assert_eq!(normalize_spacing(r"$\sum _{i}$"), r"$\sum_{i}$");
        // control space before a subscript is meaningful
        assert_eq!(normalize_spacing(r"$a\ _{1}$"), r"$a\ _{1}$");
        // a bare script without a group is left as written
        assert_eq!(normalize_spacing(r"$x _n$"), r"$x _n$");
    }

    #[test]
    fn test_prose_untouched() {
        let input = "snake _ {case} and |a| outside math";
        assert_eq!(normalize_spacing(input), input);
    }

    #[test]
    fn test_delimiters_kept() {
        assert_eq!(normalize_spacing(r"\(x ^ {2}\)"), r"\(x^{2}\)");
        assert_eq!(normalize_spacing(r"\(p = $5\)"), r"\(p = $5\)");
        assert_eq!(normalize_spacing(r"\[a _ {1}\] costs $5"), r"\[a_{1}\] costs $5");
    }

    #[test]
    fn test_idempotent() {
        let input = r"$$\langle n |V| m\rangle = E _ {n} ^ {(1)}$$ and $a |b|$";
        let once = normalize_spacing(input);
        assert_eq!(once, r"$$\langle n | V | m \rangle = E_{n}^{(1)}$$ and $a |b|$");
        assert_eq!(normalize_spacing(&once), once);
    }
}
