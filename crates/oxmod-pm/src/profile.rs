//! Profile configuration: forced USE flags
//!
//! A profile forces flags on or off for every package a constraint atom
//! matches, regardless of what the solver would otherwise pick. The
//! resolver turns these into unconditional unit clauses.

use serde::{Deserialize, Serialize};

use oxmod_atom::{atom_sat, Atom};

use crate::error::Result;

/// One `use.force`-style entry: flags forced for matching packages.
/// A leading `-` on a flag forces it off.
#[derive(Debug, Clone)]
struct ForcedUse {
    atom: Atom,
    flags: Vec<String>,
}

/// Serialized profile record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForcedUseMeta {
    pub atom: String,
    pub flags: Vec<String>,
}

/// Profile-sourced flag overrides.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    forced: Vec<ForcedUse>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `flags` for every package matching `atom`.
    pub fn force_use(&mut self, atom: Atom, flags: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.forced.push(ForcedUse {
            atom,
            flags: flags.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Build a profile from a JSON array of forced-use records.
    pub fn from_json(input: &str) -> Result<Self> {
        let metas: Vec<ForcedUseMeta> = serde_json::from_str(input)?;
        let mut profile = Self::new();
        for meta in metas {
            profile.force_use(Atom::parse(&meta.atom)?, meta.flags);
        }
        Ok(profile)
    }

    /// All flags forced for the given fully-qualified atom, in entry order.
    pub fn get_forced_use(&self, atom: &Atom) -> Vec<String> {
        self.forced
            .iter()
            .filter(|entry| atom_sat(&entry.atom, atom))
            .flat_map(|entry| entry.flags.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> Atom {
        Atom::parse(s).unwrap()
    }

    #[test]
    fn test_forced_use_matching() {
        let mut profile = Profile::new();
        profile.force_use(atom("base/example"), ["x", "-y"]);
        profile.force_use(atom(">=base/example-2.0"), ["z"]);

        assert_eq!(profile.get_forced_use(&atom("base/example-1.0")), vec!["x", "-y"]);
        assert_eq!(
            profile.get_forced_use(&atom("base/example-2.0")),
            vec!["x", "-y", "z"]
        );
        assert!(profile.get_forced_use(&atom("base/other-1.0")).is_empty());
    }

    #[test]
    fn test_from_json() {
        let profile = Profile::from_json(r#"[{"atom": "base/example", "flags": ["x"]}]"#).unwrap();
        assert_eq!(profile.get_forced_use(&atom("base/example-1.0")), vec!["x"]);
    }
}
