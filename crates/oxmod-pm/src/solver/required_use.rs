//! REQUIRED_USE compilation to CNF
//!
//! Compiles a package's own flag-constraint expression bottom-up. Nested
//! groups become fresh synthetic variables whose truth implies the group
//! (one-directional Tseitin encoding); the root sequence is asserted under
//! the owner's selection literal, so the whole constraint is vacuous when
//! the package is not selected.

use oxmod_atom::Atom;

use crate::usestr::{human_readable_required_use, Expr, Group, GroupKind};

use super::cardinality::get_atmost_one_formulae;
use super::clause::Clause;
use super::formula::Formula;
use super::variables::{flag_token, negate, Token, VariableIndex};

pub struct RequiredUseCompiler<'a> {
    owner: &'a Atom,
    owner_token: Token,
    vars: &'a mut VariableIndex,
}

impl<'a> RequiredUseCompiler<'a> {
    pub fn new(owner: &'a Atom, vars: &'a mut VariableIndex) -> Self {
        Self {
            owner,
            owner_token: owner.to_string(),
            vars,
        }
    }

    /// Compile a parsed REQUIRED_USE sequence.
    ///
    /// Satisfying the result with the owner's selection literal true is
    /// equivalent to the original expression evaluating true under the
    /// corresponding flag assignment.
    pub fn compile(&mut self, exprs: &[Expr]) -> Formula {
        let mut formula = Formula::new();
        for expr in exprs {
            let variable = self.compile_node(expr, &mut formula);
            let clause = Clause::required_use(
                vec![negate(&self.owner_token), variable],
                self.owner_token.clone(),
                self.owner.clone(),
            )
            .with_description(human_readable_required_use(std::slice::from_ref(expr)));
            formula.push(clause);
        }
        formula
    }

    /// Compile one node, merging any internal clauses into `parent` and
    /// returning the clause-variable representing the node: the flag
    /// literal itself for tokens, a fresh synthetic variable for groups.
    fn compile_node(&mut self, expr: &Expr, parent: &mut Formula) -> Token {
        match expr {
            Expr::Token(flag) => flag_token(&self.owner_token, flag),
            Expr::Group(group) => match &group.kind {
                GroupKind::All => self.compile_all(group, parent),
                GroupKind::Conditional { flag, enabled } => {
                    self.compile_conditional(group, flag, *enabled, parent)
                }
                GroupKind::AnyOf | GroupKind::ExactlyOne | GroupKind::AtMostOne => {
                    self.compile_choice(group, parent)
                }
            },
        }
    }

    /// Plain parenthesized sequence: the group variable implies every
    /// child.
    fn compile_all(&mut self, group: &Group, parent: &mut Formula) -> Token {
        let variable = self.group_variable(group);
        let mut inner = Formula::new();
        for child in &group.children {
            let child_variable = self.compile_node(child, &mut inner);
            inner.push(self.assertion(child_variable, child));
        }
        parent.merge_guarded(inner.guard(&[negate(&variable)]));
        variable
    }

    /// `cond? ( body )`: guarded with `[-cond, -V]` so that a false
    /// condition leaves the body vacuous and `V` unconstrained; an
    /// unsatisfied guard must never block the parent aggregation.
    fn compile_conditional(
        &mut self,
        group: &Group,
        flag: &str,
        enabled: bool,
        parent: &mut Formula,
    ) -> Token {
        let variable = self.group_variable(group);
        let condition = if enabled {
            flag_token(&self.owner_token, flag)
        } else {
            negate(&flag_token(&self.owner_token, flag))
        };

        let mut inner = Formula::new();
        for child in &group.children {
            let child_variable = self.compile_node(child, &mut inner);
            inner.push(self.assertion(child_variable, child));
        }
        parent.merge_guarded(inner.guard(&[negate(&condition), negate(&variable)]));
        variable
    }

    /// `||` / `^^` / `??`: aggregate the children's clause-variables.
    /// Literal children feed in directly; group children contribute their
    /// synthetic variables, with their bodies already guarded.
    fn compile_choice(&mut self, group: &Group, parent: &mut Formula) -> Token {
        let variable = self.group_variable(group);
        let mut inner = Formula::new();
        let clause_variables: Vec<Token> = group
            .children
            .iter()
            .map(|child| self.compile_node(child, &mut inner))
            .collect();

        if !matches!(group.kind, GroupKind::AtMostOne) {
            inner.push(
                Clause::required_use(
                    clause_variables.clone(),
                    self.owner_token.clone(),
                    self.owner.clone(),
                )
                .with_description(human_readable_required_use(std::slice::from_ref(
                    &Expr::Group(group.clone()),
                ))),
            );
        }
        if !matches!(group.kind, GroupKind::AnyOf) {
            for pair in get_atmost_one_formulae(&clause_variables) {
                inner.push(Clause::required_use(
                    pair.to_vec(),
                    self.owner_token.clone(),
                    self.owner.clone(),
                ));
            }
        }

        parent.merge_guarded(inner.guard(&[negate(&variable)]));
        variable
    }

    fn assertion(&self, variable: Token, child: &Expr) -> Clause {
        Clause::required_use(vec![variable], self.owner_token.clone(), self.owner.clone())
            .with_description(human_readable_required_use(std::slice::from_ref(child)))
    }

    fn group_variable(&mut self, group: &Group) -> Token {
        self.vars
            .genvariable(format!("{} group '{}' of {}", group_label(&group.kind), group, self.owner))
    }
}

fn group_label(kind: &GroupKind) -> &'static str {
    match kind {
        GroupKind::All => "all-of",
        GroupKind::AnyOf => "any-of",
        GroupKind::ExactlyOne => "exactly-one",
        GroupKind::AtMostOne => "at-most-one",
        GroupKind::Conditional { .. } => "conditional",
    }
}
