//! Pairwise at-most-one encoding

use super::variables::{negate, Token};

/// Clause bodies forbidding any two of `tokens` from holding together:
/// `[-a, -b]` for every unordered pair. One token or fewer needs no
/// clauses at all.
///
/// Pairwise is quadratic, but the groups this encodes (flag variants,
/// texture sizes, choice-group branch variables) stay small, so it beats
/// the constant overhead of logarithmic encodings.
pub fn get_atmost_one_formulae(tokens: &[Token]) -> Vec<[Token; 2]> {
    let mut pairs = Vec::new();
    for (i, first) in tokens.iter().enumerate() {
        for second in &tokens[i + 1..] {
            pairs.push([negate(first), negate(second)]);
        }
    }
    pairs
}
