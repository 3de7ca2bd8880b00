//! Token/variable interning for the formula compiler

use std::collections::HashMap;

use indexmap::IndexMap;

/// A literal in token form: an atom string (selection), `atom[flag]`
/// (flag state) or a synthetic variable, optionally prefixed with `-`
/// for negation.
pub type Token = String;

/// Prefix marking synthetic variables. Tokens carrying it are internal
/// scaffolding and are excluded from atom/flag bookkeeping.
pub const SYNTHETIC_PREFIX: &str = "__aux";

/// Negate a token: strip or prepend the leading `-`.
pub fn negate(token: &str) -> Token {
    match token.strip_prefix('-') {
        Some(rest) => rest.to_string(),
        None => format!("-{token}"),
    }
}

pub fn is_negated(token: &str) -> bool {
    token.starts_with('-')
}

/// The token without its sign.
pub fn unsigned(token: &str) -> &str {
    token.strip_prefix('-').unwrap_or(token)
}

pub fn is_synthetic(token: &str) -> bool {
    unsigned(token).starts_with(SYNTHETIC_PREFIX)
}

/// The flag-state token for `flag` on the package identified by
/// `atom_token`. A leading `-` on the flag yields the negated token.
pub fn flag_token(atom_token: &str, flag: &str) -> Token {
    match flag.strip_prefix('-') {
        Some(f) => format!("-{atom_token}[{f}]"),
        None => format!("{atom_token}[{flag}]"),
    }
}

/// Bidirectional token-to-integer interning plus a generator of synthetic
/// variables.
///
/// One instance is owned per resolution attempt and passed explicitly;
/// sharing an index across attempts would leak variable numbers between
/// unrelated formulas.
#[derive(Debug, Clone, Default)]
pub struct VariableIndex {
    /// Unsigned token -> positive variable number
    forward: IndexMap<String, i32>,
    /// Variable number - 1 -> unsigned token
    names: Vec<String>,
    /// Descriptions attached to synthetic variables, for explanations only
    descriptions: HashMap<Token, String>,
    aux_counter: u64,
}

impl VariableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The signed integer for a token, assigning a fresh variable on first
    /// sight of either polarity. For every `s`,
    /// `getnum(s) == -getnum("-" + s)`.
    pub fn getnum(&mut self, token: &str) -> i32 {
        let negated = is_negated(token);
        let base = unsigned(token);
        let num = match self.forward.get(base) {
            Some(&num) => num,
            None => {
                let num = self.names.len() as i32 + 1;
                self.forward.insert(base.to_string(), num);
                self.names.push(base.to_string());
                num
            }
        };
        if negated {
            -num
        } else {
            num
        }
    }

    /// The token for a signed variable number.
    ///
    /// Panics if the number was never assigned; that is a programmer error,
    /// not an input condition.
    pub fn getstring(&self, num: i32) -> Token {
        if num == 0 {
            panic!("0 is not a variable number");
        }
        let base = self
            .names
            .get((num.unsigned_abs() - 1) as usize)
            .unwrap_or_else(|| panic!("no token assigned to variable {num}"));
        if num < 0 {
            format!("-{base}")
        } else {
            base.clone()
        }
    }

    /// Mint a fresh synthetic variable carrying a human-readable
    /// description. The description never reaches the solver; it only
    /// feeds conflict explanations.
    pub fn genvariable(&mut self, description: impl Into<String>) -> Token {
        self.aux_counter += 1;
        let token = format!("{SYNTHETIC_PREFIX}{}", self.aux_counter);
        self.descriptions.insert(token.clone(), description.into());
        token
    }

    /// The description attached to a synthetic variable, if any.
    pub fn describe(&self, token: &str) -> Option<&str> {
        self.descriptions.get(unsigned(token)).map(String::as_str)
    }

    /// Number of assigned variables.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
