//! Tokenizer and renderer for USE-conditional strings
//!
//! DEPEND, RDEPEND and REQUIRED_USE share one surface syntax: whitespace
//! separated tokens with parenthesized groups, group operators `||` (any-of),
//! `^^` (exactly-one), `??` (at-most-one) and `flag? ( ... )` conditionals.
//! Parsing produces a closed expression tree; every operator the compilers
//! can meet downstream is a variant here, so malformed input fails fast in
//! this module and nowhere else.

use std::fmt;

use crate::error::{OxmodError, Result};

/// A node in a parsed USE-conditional expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A plain token: a USE flag in REQUIRED_USE context, an atom in
    /// dependency context. May carry a leading `-`/`!` handled by the
    /// respective compiler.
    Token(String),
    Group(Group),
}

/// A parenthesized group with its operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub kind: GroupKind,
    pub children: Vec<Expr>,
}

/// Group operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// Plain parenthesized sequence: all children must hold
    All,
    /// `||`: at least one child must hold
    AnyOf,
    /// `^^`: exactly one child must hold
    ExactlyOne,
    /// `??`: at most one child may hold
    AtMostOne,
    /// `flag? ( ... )` / `!flag? ( ... )`: children must hold when the
    /// condition flag is enabled (resp. disabled)
    Conditional { flag: String, enabled: bool },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Token(t) => write!(f, "{t}"),
            Expr::Group(g) => write!(f, "{g}"),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children: Vec<String> = self.children.iter().map(|c| c.to_string()).collect();
        let body = children.join(" ");
        match &self.kind {
            GroupKind::All => write!(f, "( {body} )"),
            GroupKind::AnyOf => write!(f, "|| ( {body} )"),
            GroupKind::ExactlyOne => write!(f, "^^ ( {body} )"),
            GroupKind::AtMostOne => write!(f, "?? ( {body} )"),
            GroupKind::Conditional { flag, enabled: true } => write!(f, "{flag}? ( {body} )"),
            GroupKind::Conditional { flag, enabled: false } => write!(f, "!{flag}? ( {body} )"),
        }
    }
}

/// Parse a USE-conditional string into its expression sequence.
///
/// The top level is an implicit all-of sequence. Malformed input
/// (unbalanced parentheses, dangling operators) is a fatal input error.
pub fn parse_usestr(input: &str) -> Result<Vec<Expr>> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let mut pos = 0;
    let exprs = parse_sequence(&tokens, &mut pos, false)?;
    if pos != tokens.len() {
        return Err(unexpected(&tokens, pos, "unbalanced closing parenthesis"));
    }
    Ok(exprs)
}

fn parse_sequence(tokens: &[&str], pos: &mut usize, in_group: bool) -> Result<Vec<Expr>> {
    let mut exprs = Vec::new();
    while *pos < tokens.len() {
        match tokens[*pos] {
            ")" => {
                if in_group {
                    return Ok(exprs);
                }
                return Err(unexpected(tokens, *pos, "unbalanced closing parenthesis"));
            }
            "(" => {
                *pos += 1;
                exprs.push(Expr::Group(Group {
                    kind: GroupKind::All,
                    children: parse_group_body(tokens, pos)?,
                }));
            }
            op @ ("||" | "^^" | "??") => {
                let kind = match op {
                    "||" => GroupKind::AnyOf,
                    "^^" => GroupKind::ExactlyOne,
                    _ => GroupKind::AtMostOne,
                };
                *pos += 1;
                expect_open(tokens, pos)?;
                exprs.push(Expr::Group(Group {
                    kind,
                    children: parse_group_body(tokens, pos)?,
                }));
            }
            token if token.ends_with('?') => {
                let condition = &token[..token.len() - 1];
                let (flag, enabled) = match condition.strip_prefix('!') {
                    Some(f) => (f, false),
                    None => (condition, true),
                };
                if flag.is_empty() {
                    return Err(unexpected(tokens, *pos, "conditional with empty flag"));
                }
                let kind = GroupKind::Conditional {
                    flag: flag.to_string(),
                    enabled,
                };
                *pos += 1;
                expect_open(tokens, pos)?;
                exprs.push(Expr::Group(Group {
                    kind,
                    children: parse_group_body(tokens, pos)?,
                }));
            }
            token => {
                exprs.push(Expr::Token(token.to_string()));
                *pos += 1;
            }
        }
    }
    if in_group {
        return Err(unexpected(tokens, *pos, "unclosed group"));
    }
    Ok(exprs)
}

fn parse_group_body(tokens: &[&str], pos: &mut usize) -> Result<Vec<Expr>> {
    let children = parse_sequence(tokens, pos, true)?;
    if *pos >= tokens.len() || tokens[*pos] != ")" {
        return Err(unexpected(tokens, *pos, "unclosed group"));
    }
    *pos += 1;
    Ok(children)
}

fn expect_open(tokens: &[&str], pos: &mut usize) -> Result<()> {
    if *pos >= tokens.len() || tokens[*pos] != "(" {
        return Err(unexpected(tokens, *pos, "operator must be followed by a group"));
    }
    *pos += 1;
    Ok(())
}

fn unexpected(tokens: &[&str], pos: usize, message: &str) -> OxmodError {
    let near = tokens.get(pos).copied().unwrap_or("<end>");
    OxmodError::InvalidExpression {
        message: format!("{message}, near \"{near}\""),
        position: pos,
    }
}

/// Render an expression sequence for humans, spelling the group operators
/// out in words. Used for clause descriptions in conflict explanations.
pub fn human_readable_required_use(exprs: &[Expr]) -> String {
    exprs.iter().map(render_expr).collect::<Vec<_>>().join(" and ")
}

fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Token(t) => match t.strip_prefix('-') {
            Some(flag) => format!("{flag} disabled"),
            None => format!("{t} enabled"),
        },
        Expr::Group(group) => {
            let body = group
                .children
                .iter()
                .map(render_expr)
                .collect::<Vec<_>>()
                .join(", ");
            match &group.kind {
                GroupKind::All => format!("all of [{body}]"),
                GroupKind::AnyOf => format!("at least one of [{body}]"),
                GroupKind::ExactlyOne => format!("exactly one of [{body}]"),
                GroupKind::AtMostOne => format!("at most one of [{body}]"),
                GroupKind::Conditional { flag, enabled: true } => {
                    format!("if {flag} is enabled then {body}")
                }
                GroupKind::Conditional { flag, enabled: false } => {
                    format!("if {flag} is disabled then {body}")
                }
            }
        }
    }
}
