//! Package database: atom-to-candidate resolution
//!
//! The resolver treats the repository as a synchronous black box: it hands
//! in a constraint atom and gets back every matching candidate package.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use oxmod_atom::{atom_sat, Atom};

use crate::error::Result;
use crate::package::Package;

/// Source of candidate packages for the resolver.
pub trait Repository {
    /// All packages matching the constraint atom, in repository order.
    /// Zero candidates is not an error here; the caller decides.
    fn load_pkg(&self, atom: &Atom) -> Vec<Arc<Package>>;

    /// The single package named by a fully-qualified atom.
    fn load_pkg_fq(&self, atom: &Atom) -> Option<Arc<Package>>;
}

/// Serialized package record, the on-disk metadata shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMeta {
    pub atom: String,
    #[serde(default)]
    pub depend: String,
    #[serde(default)]
    pub rdepend: String,
    #[serde(default)]
    pub required_use: String,
    #[serde(default)]
    pub iuse: Vec<String>,
    #[serde(default)]
    pub texture_sizes: Vec<String>,
}

/// In-memory package repository keyed by `category/name`.
#[derive(Debug, Clone, Default)]
pub struct PackageRepository {
    packages: IndexMap<String, Vec<Arc<Package>>>,
}

impl PackageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package under its `category/name` key.
    pub fn add_package(&mut self, package: Package) -> &mut Self {
        self.packages
            .entry(package.atom.cpn())
            .or_default()
            .push(Arc::new(package));
        self
    }

    /// Build a repository from a JSON array of package records.
    pub fn from_json(input: &str) -> Result<Self> {
        let metas: Vec<PackageMeta> = serde_json::from_str(input)?;
        let mut repo = Self::new();
        for meta in metas {
            let atom = Atom::parse(&meta.atom)?;
            let package = Package::new(atom)
                .with_depend(meta.depend)
                .with_rdepend(meta.rdepend)
                .with_required_use(meta.required_use)
                .with_iuse(meta.iuse)
                .with_texture_sizes(meta.texture_sizes);
            repo.add_package(package);
        }
        Ok(repo)
    }

    /// Number of distinct `category/name` entries.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Repository for PackageRepository {
    fn load_pkg(&self, atom: &Atom) -> Vec<Arc<Package>> {
        self.packages
            .get(&atom.cpn())
            .map(|candidates| {
                candidates
                    .iter()
                    .filter(|p| atom_sat(atom, &p.atom))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn load_pkg_fq(&self, atom: &Atom) -> Option<Arc<Package>> {
        self.packages
            .get(&atom.cpn())
            .and_then(|candidates| candidates.iter().find(|p| p.atom == *atom))
            .cloned()
    }
}
