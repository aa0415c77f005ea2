// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Expression matcher (C1). Compiles a textual pattern (regex or literal)
//! and evaluates it against connection/profile strings. See spec.md §4.1.

use crate::error::TurbulenceError;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExprKind {
    Literal,
    Regex,
    Negated,
}

/// A compiled pattern. Matching is a total function: every `Expr` matches
/// or doesn't match any given input, never errors.
#[derive(Clone)]
pub struct Expr {
    original: String,
    kind: ExprKind,
    #[cfg(feature = "regex")]
    compiled: Option<regex::Regex>,
    literal: String,
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expr")
            .field("original", &self.original)
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.original == other.original
    }
}

impl Expr {
    /// Compile `text` into a matchable expression.
    ///
    /// A leading `!` is honored as negation (DESIGN NOTES, spec.md §9):
    /// the rest of the text is compiled normally and the match result is
    /// inverted. When the `regex` feature is enabled the remainder is
    /// compiled as a regular expression; otherwise it is kept as an exact
    /// literal string, which is the documented compile-time capability
    /// fallback from spec.md §4.1.
    pub fn compile(text: &str) -> Result<Self, TurbulenceError> {
        let (negated, body) = match text.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        #[cfg(feature = "regex")]
        {
            let compiled = regex::Regex::new(body)
                .map_err(|e| TurbulenceError::BadPattern(format!("{text}: {e}")))?;
            return Ok(Self {
                original: text.to_string(),
                kind: if negated {
                    ExprKind::Negated
                } else {
                    ExprKind::Regex
                },
                compiled: Some(compiled),
                literal: body.to_string(),
            });
        }

        #[cfg(not(feature = "regex"))]
        {
            Ok(Self {
                original: text.to_string(),
                kind: if negated {
                    ExprKind::Negated
                } else {
                    ExprKind::Literal
                },
                literal: body.to_string(),
            })
        }
    }

    /// Evaluate this expression against `input`. Total: never panics,
    /// never errors.
    pub fn matches(&self, input: &str) -> bool {
        let positive = self.matches_inner(input);
        match self.kind {
            ExprKind::Negated => !positive,
            _ => positive,
        }
    }

    fn matches_inner(&self, input: &str) -> bool {
        #[cfg(feature = "regex")]
        if let Some(re) = &self.compiled {
            return re.is_match(input);
        }
        self.literal == input
    }

    /// The original source text, for diagnostics (spec.md §4.6.2 step 3).
    pub fn original(&self) -> &str {
        &self.original
    }
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod tests;
