//! Formula synthesis for dependency resolution
//!
//! Translates the package universe reachable from a request into a
//! weighted CNF-with-cardinality formula for an external SAT/MaxSAT
//! solver. Solving itself, and turning a model back into an install plan,
//! live outside this crate.

mod cardinality;
mod clause;
mod depend;
mod driver;
mod explain;
mod formula;
mod request;
mod required_use;
mod variables;

pub use cardinality::get_atmost_one_formulae;
pub use clause::{Clause, ClauseKind};
pub use depend::DependencyCompiler;
pub use driver::FormulaCompiler;
pub use explain::{describe_conflicts, find_conflicts, Conflict};
pub use formula::{Formula, GuardedFormula, WcnfPlus};
pub use request::Request;
pub use required_use::RequiredUseCompiler;
pub use variables::{flag_token, is_negated, is_synthetic, negate, unsigned, Token, VariableIndex};

#[cfg(test)]
mod tests;
