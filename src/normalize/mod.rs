//! Math markup normalization.
//!
//! Generator output is pushed through a fixed, numbered pipeline of total
//! rewrites. Each stage is idempotent on its own and the composed pipeline is
//! idempotent as a whole:
//!
//! 1. [`Pass::Unescape`] collapses `\\cmd` to `\cmd` for known commands.
//! 2. [`Pass::RepairLiterals`] fixes known garbled notation.
//! 3. [`Pass::Delimiters`] canonicalizes math delimiters and promotes matrices
//!    to display mode. Its matrix detection only sees single-escaped
//!    `\begin`/`\end`, so stages 1 and 2 must have run first.
//! 4. [`Pass::Spacing`] tidies bra-ket and script spacing inside math.
//! 5. [`Pass::Cleanup`] collapses blank-line runs and drops unrenderable
//!    characters.
//!
//! The pipeline only ever sees a complete answer. Running it on streamed
//! fragments could split a command name across two calls.

mod cleanup;
mod delimiters;
mod escape;
mod segments;
mod spacing;

use std::fmt;
use std::ops::Deref;

pub use cleanup::{cleanup, is_renderable, strip_unrenderable};
pub use delimiters::normalize_delimiters;
pub use escape::{collapse_double_escapes, repair_literals};
pub use spacing::normalize_spacing;

/// One stage of the normalization pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Unescape,
    RepairLiterals,
    Delimiters,
    Spacing,
    Cleanup,
}

/// Stages in the order they must run
pub const PIPELINE: [Pass; 5] = [
    Pass::Unescape,
    Pass::RepairLiterals,
    Pass::Delimiters,
    Pass::Spacing,
    Pass::Cleanup,
];

impl Pass {
    pub fn apply(&self, text: &str) -> String {
        match self {
            Pass::Unescape => collapse_double_escapes(text),
            Pass::RepairLiterals => repair_literals(text),
            Pass::Delimiters => normalize_delimiters(text),
            Pass::Spacing => normalize_spacing(text),
            Pass::Cleanup => cleanup(text),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pass::Unescape => "unescape",
            Pass::RepairLiterals => "repair-literals",
            Pass::Delimiters => "delimiters",
            Pass::Spacing => "spacing",
            Pass::Cleanup => "cleanup",
        }
    }
}

/// Answer text that has been through the full pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for NormalizedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run the full pipeline over a complete answer.
pub fn normalize(text: &str) -> NormalizedText {
    // Unrenderable characters go first so no later stage sees two pieces of
    // markup that only become adjacent once they are removed.
    let mut current = strip_unrenderable(text);

    // Stages 1 and 2 iterate together: a literal repair can expose a fresh
    // double escape.
    for _ in 0..escape::MAX_REPAIR_ROUNDS {
        let next = Pass::RepairLiterals.apply(&Pass::Unescape.apply(&current));
        if next == current {
            break;
        }
        current = next;
    }

    for pass in &PIPELINE[2..] {
        let next = pass.apply(&current);
        if next != current {
            tracing::trace!(pass = pass.name(), "Normalization pass rewrote text");
        }
        current = next;
    }

    NormalizedText(current)
}
