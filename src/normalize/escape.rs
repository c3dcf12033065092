//! Stages 1 and 2: escaping repairs that run before any delimiter work.

/// Commands whose doubled escape is collapsed by stage 1
const KNOWN_COMMANDS: &[&str] = &[
    // fractions, roots, calculus
    "frac", "dfrac", "tfrac", "sqrt", "partial", "nabla", "int", "oint", "sum", "prod",
    // operators and accents
    "hat", "vec", "bar", "dot", "ddot", "tilde", "hbar", "dagger", "cdot", "times", "infty",
    "approx", "pm", "text", "mathrm",
    // bra-ket delimiters
    "langle", "rangle", "angle",
    // environments
    "begin", "end", "matrix", "pmatrix", "bmatrix", "Bmatrix", "vmatrix", "Vmatrix",
    // greek
    "alpha", "beta", "gamma", "Gamma", "delta", "Delta", "epsilon", "varepsilon", "theta",
    "Theta", "kappa", "lambda", "Lambda", "mu", "nu", "xi", "pi", "Pi", "rho", "sigma", "Sigma",
    "tau", "phi", "Phi", "varphi", "chi", "psi", "Psi", "omega", "Omega",
    // trig
    "sin", "cos", "tan", "cot", "sec", "csc",
];

/// Known garbled artifacts and their repairs, applied as exact substrings.
///
/// Longer patterns come first so a shorter one never consumes part of them.
const LITERAL_REPAIRS: &[(&str, &str)] = &[
    ("-3eEa_0", "-3E_0"),
    ("3ea_0", "3E_0"),
    ("eEa_0", "E_0"),
    ("eEz", ""),
];

/// Upper bound on repair rounds; every round that changes anything shrinks the text
/// or retires an `\angle`, so real input settles in one or two.
pub(crate) const MAX_REPAIR_ROUNDS: usize = 16;

pub(crate) fn is_known_command(word: &str) -> bool {
    KNOWN_COMMANDS.contains(&word)
}

/// Walk every backslash run in `text` together with the ASCII word that follows it.
///
/// `rewrite(run, word)` may return a replacement for the run and word; `None`
/// keeps them verbatim. Backslashes and ASCII letters are single bytes, so
/// byte offsets taken here are always char boundaries.
pub(crate) fn map_commands<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(usize, &str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let escaped = &rest[pos..];
        let run = escaped.bytes().take_while(|&b| b == b'\\').count();
        let tail = &escaped[run..];
        let word_len = tail.bytes().take_while(u8::is_ascii_alphabetic).count();
        let word = &tail[..word_len];

        match rewrite(run, word) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&escaped[..run + word_len]),
        }
        rest = &tail[word_len..];
    }

    out.push_str(rest);
    out
}

/// Stage 1: `\\frac` becomes `\frac` for every command in the known table.
///
/// Only runs of exactly two backslashes collapse. A run of three is a row
/// separator followed by a command and is left alone, as are unknown words.
pub fn collapse_double_escapes(text: &str) -> String {
    map_commands(text, |run, word| {
        (run == 2 && is_known_command(word)).then(|| format!("\\{}", word))
    })
}

/// Stage 2: fixed literal repairs for garbled physics notation.
///
/// Iterated to a fixed point, since removing one artifact can splice together
/// the pieces of another.
pub fn repair_literals(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_REPAIR_ROUNDS {
        let next = repair_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn repair_once(text: &str) -> String {
    let mut repaired = LITERAL_REPAIRS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| {
            if acc.contains(from) {
                acc.replace(from, to)
            } else {
                acc
            }
        });

    // `\angle` is the generator's misspelling of the bra delimiter
    if repaired.contains("\\angle") {
        repaired = map_commands(&repaired, |run, word| {
            (run % 2 == 1 && word == "angle").then(|| format!("{}langle", "\\".repeat(run)))
        });
    }

    repaired
}
