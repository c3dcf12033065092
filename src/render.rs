//! Options handed to the external math typesetter.
//!
//! Normalized answers are meant for a permissive KaTeX-style renderer. The
//! configuration below is serialised as JSON so a front end can load it as-is.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;

/// Quantum-mechanics shorthands, matrix shortcuts and the `\angle` bra fix
const MACROS: &[(&str, &str)] = &[
    (r"\ket", r"\left|#1\right\rangle"),
    (r"\bra", r"\left\langle#1\right|"),
    (r"\braket", r"\left\langle#1\right\rangle"),
    (r"\expval", r"\left\langle#1\right\rangle"),
    (r"\ketbra", r"\left|#1\right\rangle\left\langle#2\right|"),
    (r"\mat", r"\begin{pmatrix}#1\end{pmatrix}"),
    (r"\det", r"\begin{vmatrix}#1\end{vmatrix}"),
    (r"\Tr", r"\mathrm{Tr}"),
    (r"\Re", r"\mathrm{Re}"),
    (r"\Im", r"\mathrm{Im}"),
    (r"\angle", r"\langle"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delimiter {
    pub left: &'static str,
    pub right: &'static str,
    pub display: bool,
}

/// Display delimiters come first so `$$` is never read as two `$`
pub const DELIMITERS: [Delimiter; 4] = [
    Delimiter {
        left: "$$",
        right: "$$",
        display: true,
    },
    Delimiter {
        left: "$",
        right: "$",
        display: false,
    },
    Delimiter {
        left: r"\[",
        right: r"\]",
        display: true,
    },
    Delimiter {
        left: r"\(",
        right: r"\)",
        display: false,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererConfig {
    pub throw_on_error: bool,
    pub strict: bool,
    pub trust: bool,
    pub error_color: String,
    pub display_mode: bool,
    pub max_expand: u32,
    pub macros: BTreeMap<String, String>,
    pub delimiters: Vec<Delimiter>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            throw_on_error: false,
            strict: false,
            trust: true,
            error_color: "#ff6b6b".to_string(),
            display_mode: false,
            max_expand: 1000,
            macros: MACROS
                .iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
            delimiters: DELIMITERS.to_vec(),
        }
    }
}

impl RendererConfig {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
