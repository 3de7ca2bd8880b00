//! Resolution requests

use oxmod_atom::Atom;

/// What the user asked to have installed.
///
/// Targets keep their USE qualifiers; the driver compiles those into
/// unconditional flag-state clauses on the matching candidates.
#[derive(Debug, Clone, Default)]
pub struct Request {
    targets: Vec<Atom>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an explicitly requested target.
    pub fn install(&mut self, atom: Atom) -> &mut Self {
        self.targets.push(atom);
        self
    }

    pub fn targets(&self) -> &[Atom] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
