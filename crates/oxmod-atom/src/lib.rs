//! Atom parsing and matching for the oxmod package manager
//!
//! This crate provides versioned package atoms (`category/name-version` with
//! optional operator, blocker and USE-dependency qualifiers), version
//! comparison, and the `atom_sat` constraint predicate used by the resolver.

mod atom;
mod version;

pub use atom::{atom_sat, Atom, AtomError, Blocker, Operator, UseDep};
pub use version::{Suffix, SuffixKind, Version};
