//! Package model for installable mods

use indexmap::IndexSet;

use oxmod_atom::Atom;

/// A concrete, loadable package: one version of one mod, together with the
/// metadata the resolver consumes.
///
/// `atom` is always fully qualified (`category/name-version`); its string
/// form is the package's selection token in the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Fully-qualified atom identifying this package
    pub atom: Atom,
    /// Build-time dependency string
    pub depend: String,
    /// Runtime dependency string
    pub rdepend: String,
    /// Boolean constraint over this package's own USE flags
    pub required_use: String,
    /// Effective USE flag set (declared flags plus variant flags)
    pub iuse_effective: IndexSet<String>,
    /// Exclusive texture-size variants, e.g. `["512", "1024"]`
    pub texture_sizes: Vec<String>,
}

impl Package {
    /// Create a package from its fully-qualified atom.
    pub fn new(atom: Atom) -> Self {
        debug_assert!(atom.is_fully_qualified(), "package atom must carry a version");
        Self {
            atom,
            depend: String::new(),
            rdepend: String::new(),
            required_use: String::new(),
            iuse_effective: IndexSet::new(),
            texture_sizes: Vec::new(),
        }
    }

    /// Set the build-time dependency string
    pub fn with_depend(mut self, depend: impl Into<String>) -> Self {
        self.depend = depend.into();
        self
    }

    /// Set the runtime dependency string
    pub fn with_rdepend(mut self, rdepend: impl Into<String>) -> Self {
        self.rdepend = rdepend.into();
        self
    }

    /// Set the REQUIRED_USE constraint string
    pub fn with_required_use(mut self, required_use: impl Into<String>) -> Self {
        self.required_use = required_use.into();
        self
    }

    /// Declare USE flags in the effective flag set
    pub fn with_iuse(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.iuse_effective.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Declare exclusive texture-size variants.
    ///
    /// Each size also contributes a `texture_size_<n>` flag to the
    /// effective flag set.
    pub fn with_texture_sizes(mut self, sizes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for size in sizes {
            let size = size.into();
            self.iuse_effective.insert(texture_size_flag(&size));
            self.texture_sizes.push(size);
        }
        self
    }

    /// The package's selection token: its fully-qualified atom string.
    pub fn selection_token(&self) -> String {
        self.atom.to_string()
    }

    /// Whether this package declares `flag` in its effective flag set.
    pub fn declares_flag(&self, flag: &str) -> bool {
        self.iuse_effective.contains(flag)
    }
}

/// The USE flag corresponding to a texture-size variant.
pub fn texture_size_flag(size: &str) -> String {
    format!("texture_size_{size}")
}
