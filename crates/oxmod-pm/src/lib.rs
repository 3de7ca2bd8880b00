pub mod error;
pub mod package;
pub mod profile;
pub mod repository;
pub mod solver;
pub mod usestr;

pub use error::{OxmodError, Result};
pub use package::Package;
pub use profile::Profile;
pub use repository::{PackageRepository, Repository};
pub use solver::{Clause, ClauseKind, Formula, FormulaCompiler, Request, VariableIndex, WcnfPlus};
pub use usestr::{human_readable_required_use, parse_usestr, Expr, Group, GroupKind};
