//! Package atoms: versioned, qualified package references

use std::cmp::Ordering;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::version::Version;

lazy_static! {
    static ref CPN_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9+_.-]*/[A-Za-z0-9][A-Za-z0-9+_-]*$").unwrap();
    static ref FLAG_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9+_-]*$").unwrap();
}

/// Error type for atom parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtomError {
    #[error("invalid atom \"{0}\"")]
    InvalidAtom(String),
    #[error("invalid version string \"{0}\"")]
    InvalidVersion(String),
    #[error("operator \"{operator}\" requires a version in \"{atom}\"")]
    MissingVersion { operator: String, atom: String },
    #[error("invalid USE dependency \"{0}\"")]
    InvalidUseDep(String),
}

/// Blocker strength on a dependency atom.
///
/// A weak blocker (`!`) expresses a preference against co-installation;
/// a strong blocker (`!!`) is a hard mutual exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blocker {
    Weak,
    Strong,
}

/// Version comparison operator prefix on an atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=` exact version
    Equal,
    /// `>=`
    GreaterEqual,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `~` same version, any revision
    AnyRevision,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::AnyRevision => "~",
        }
    }
}

/// A USE-flag qualifier on a dependency atom: `[flag]` requires the flag
/// enabled on the target, `[-flag]` requires it disabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UseDep {
    pub flag: String,
    pub enabled: bool,
}

impl fmt::Display for UseDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled {
            write!(f, "{}", self.flag)
        } else {
            write!(f, "-{}", self.flag)
        }
    }
}

/// A package atom: `category/name`, optionally version-qualified with an
/// operator prefix, optionally blocker-prefixed, optionally carrying
/// USE-dependency qualifiers.
///
/// A fully-qualified atom (`category/name-version`, no operator) names one
/// concrete package and doubles as that package's selection token in the
/// resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    category: String,
    name: String,
    operator: Option<Operator>,
    version: Option<Version>,
    blocker: Option<Blocker>,
    use_deps: Vec<UseDep>,
}

impl Atom {
    /// Parse an atom string.
    pub fn parse(input: &str) -> Result<Self, AtomError> {
        let mut rest = input;

        let blocker = if let Some(r) = rest.strip_prefix("!!") {
            rest = r;
            Some(Blocker::Strong)
        } else if let Some(r) = rest.strip_prefix('!') {
            rest = r;
            Some(Blocker::Weak)
        } else {
            None
        };

        let use_deps = if let Some(open) = rest.find('[') {
            if !rest.ends_with(']') {
                return Err(AtomError::InvalidAtom(input.to_string()));
            }
            let inner = &rest[open + 1..rest.len() - 1];
            rest = &rest[..open];
            parse_use_deps(inner)?
        } else {
            Vec::new()
        };

        let operator = if let Some(r) = rest.strip_prefix(">=") {
            rest = r;
            Some(Operator::GreaterEqual)
        } else if let Some(r) = rest.strip_prefix("<=") {
            rest = r;
            Some(Operator::LessEqual)
        } else if let Some(r) = rest.strip_prefix('>') {
            rest = r;
            Some(Operator::Greater)
        } else if let Some(r) = rest.strip_prefix('<') {
            rest = r;
            Some(Operator::Less)
        } else if let Some(r) = rest.strip_prefix('=') {
            rest = r;
            Some(Operator::Equal)
        } else if let Some(r) = rest.strip_prefix('~') {
            rest = r;
            Some(Operator::AnyRevision)
        } else {
            None
        };

        let (cpn, version) = split_version(rest);
        if !CPN_RE.is_match(cpn) {
            return Err(AtomError::InvalidAtom(input.to_string()));
        }
        let version = match version {
            Some(v) => Some(Version::parse(v)?),
            None => None,
        };

        if operator.is_some() && version.is_none() {
            return Err(AtomError::MissingVersion {
                operator: operator.map(Operator::as_str).unwrap_or("").to_string(),
                atom: input.to_string(),
            });
        }

        let (category, name) = cpn.split_once('/').ok_or_else(|| AtomError::InvalidAtom(input.to_string()))?;

        Ok(Self {
            category: category.to_string(),
            name: name.to_string(),
            operator,
            version,
            blocker,
            use_deps,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `category/name` without version, operator or qualifiers.
    pub fn cpn(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn operator(&self) -> Option<Operator> {
        self.operator
    }

    pub fn blocker(&self) -> Option<Blocker> {
        self.blocker
    }

    pub fn use_deps(&self) -> &[UseDep] {
        &self.use_deps
    }

    /// True for `category/name-version` atoms that name one concrete package.
    pub fn is_fully_qualified(&self) -> bool {
        self.operator.is_none() && self.blocker.is_none() && self.version.is_some()
    }

    /// A copy with USE-dependency qualifiers removed.
    pub fn strip_use(&self) -> Atom {
        Atom {
            use_deps: Vec::new(),
            ..self.clone()
        }
    }

    /// A copy with the blocker prefix removed.
    pub fn strip_blocker(&self) -> Atom {
        Atom {
            blocker: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.blocker {
            Some(Blocker::Weak) => write!(f, "!")?,
            Some(Blocker::Strong) => write!(f, "!!")?,
            None => {}
        }
        if let Some(op) = self.operator {
            write!(f, "{}", op.as_str())?;
        }
        write!(f, "{}/{}", self.category, self.name)?;
        if let Some(ref version) = self.version {
            write!(f, "-{version}")?;
        }
        if !self.use_deps.is_empty() {
            let flags: Vec<String> = self.use_deps.iter().map(|u| u.to_string()).collect();
            write!(f, "[{}]", flags.join(","))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Atom {
    type Err = AtomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `category/name-version` into its name and version parts.
///
/// The version starts at the first hyphen followed by a digit whose
/// remainder parses as a valid version.
fn split_version(input: &str) -> (&str, Option<&str>) {
    let bytes = input.as_bytes();
    for (i, _) in input.match_indices('-') {
        if bytes.get(i + 1).map(|b| b.is_ascii_digit()).unwrap_or(false)
            && Version::parse(&input[i + 1..]).is_ok()
        {
            return (&input[..i], Some(&input[i + 1..]));
        }
    }
    (input, None)
}

fn parse_use_deps(inner: &str) -> Result<Vec<UseDep>, AtomError> {
    if inner.is_empty() {
        return Err(AtomError::InvalidUseDep(inner.to_string()));
    }
    inner
        .split(',')
        .map(|part| {
            let (flag, enabled) = match part.strip_prefix('-') {
                Some(f) => (f, false),
                None => (part, true),
            };
            if !FLAG_RE.is_match(flag) {
                return Err(AtomError::InvalidUseDep(part.to_string()));
            }
            Ok(UseDep {
                flag: flag.to_string(),
                enabled,
            })
        })
        .collect()
}

/// Check whether `candidate` (a fully-qualified atom) satisfies the
/// `constraint` atom.
///
/// Blocker prefixes and USE qualifiers on either side are ignored; they
/// qualify how a match is used, not whether it matches.
pub fn atom_sat(constraint: &Atom, candidate: &Atom) -> bool {
    if constraint.category != candidate.category || constraint.name != candidate.name {
        return false;
    }

    let Some(ref wanted) = constraint.version else {
        return true;
    };
    let Some(ref have) = candidate.version else {
        return false;
    };

    match constraint.operator {
        // A bare versioned constraint matches exactly, like `=`.
        None | Some(Operator::Equal) => have.cmp(wanted) == Ordering::Equal,
        Some(Operator::AnyRevision) => have.cmp_ignoring_revision(wanted) == Ordering::Equal,
        Some(Operator::GreaterEqual) => have.cmp(wanted) != Ordering::Less,
        Some(Operator::LessEqual) => have.cmp(wanted) != Ordering::Greater,
        Some(Operator::Greater) => have.cmp(wanted) == Ordering::Greater,
        Some(Operator::Less) => have.cmp(wanted) == Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> Atom {
        Atom::parse(s).unwrap()
    }

    #[test]
    fn test_parse_bare() {
        let a = atom("base/example-mod");
        assert_eq!(a.category(), "base");
        assert_eq!(a.name(), "example-mod");
        assert_eq!(a.cpn(), "base/example-mod");
        assert!(a.version().is_none());
        assert!(!a.is_fully_qualified());
    }

    #[test]
    fn test_parse_fully_qualified() {
        let a = atom("base/example-1.2-r1");
        assert_eq!(a.cpn(), "base/example");
        assert_eq!(a.version().unwrap().to_string(), "1.2-r1");
        assert!(a.is_fully_qualified());
        assert_eq!(a.to_string(), "base/example-1.2-r1");
    }

    #[test]
    fn test_parse_operator() {
        let a = atom(">=base/example-2.0");
        assert_eq!(a.operator(), Some(Operator::GreaterEqual));
        assert_eq!(a.to_string(), ">=base/example-2.0");
        assert!(Atom::parse(">=base/example").is_err());
    }

    #[test]
    fn test_parse_blocker() {
        assert_eq!(atom("!base/example").blocker(), Some(Blocker::Weak));
        assert_eq!(atom("!!base/example").blocker(), Some(Blocker::Strong));
        assert_eq!(atom("base/example").blocker(), None);
        assert_eq!(atom("!!base/example").strip_blocker().blocker(), None);
    }

    #[test]
    fn test_parse_use_deps() {
        let a = atom("base/example[shaders,-legacy]");
        assert_eq!(a.use_deps().len(), 2);
        assert_eq!(a.use_deps()[0].flag, "shaders");
        assert!(a.use_deps()[0].enabled);
        assert_eq!(a.use_deps()[1].flag, "legacy");
        assert!(!a.use_deps()[1].enabled);
        assert!(a.strip_use().use_deps().is_empty());
        assert_eq!(a.to_string(), "base/example[shaders,-legacy]");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Atom::parse("").is_err());
        assert!(Atom::parse("no-category").is_err());
        assert!(Atom::parse("base/example[]").is_err());
        assert!(Atom::parse("base/example[flag").is_err());
    }

    #[test]
    fn test_name_with_hyphen_and_version() {
        let a = atom("gfx/texture-pack-2.0");
        assert_eq!(a.cpn(), "gfx/texture-pack");
        assert_eq!(a.version().unwrap().to_string(), "2.0");
    }

    #[test]
    fn test_atom_sat_names() {
        assert!(atom_sat(&atom("base/example"), &atom("base/example-1.0")));
        assert!(!atom_sat(&atom("base/other"), &atom("base/example-1.0")));
    }

    #[test]
    fn test_atom_sat_operators() {
        let candidate = atom("base/example-1.5");
        assert!(atom_sat(&atom("=base/example-1.5"), &candidate));
        assert!(!atom_sat(&atom("=base/example-1.4"), &candidate));
        assert!(atom_sat(&atom(">=base/example-1.5"), &candidate));
        assert!(atom_sat(&atom(">base/example-1.4"), &candidate));
        assert!(!atom_sat(&atom(">base/example-1.5"), &candidate));
        assert!(atom_sat(&atom("<base/example-2.0"), &candidate));
        assert!(atom_sat(&atom("<=base/example-1.5"), &candidate));
    }

    #[test]
    fn test_atom_sat_any_revision() {
        assert!(atom_sat(&atom("~base/example-1.5"), &atom("base/example-1.5-r3")));
        assert!(!atom_sat(&atom("~base/example-1.5"), &atom("base/example-1.6")));
        assert!(!atom_sat(&atom("=base/example-1.5"), &atom("base/example-1.5-r3")));
    }

    #[test]
    fn test_atom_sat_ignores_qualifiers() {
        assert!(atom_sat(&atom("!!base/example"), &atom("base/example-1.0")));
        assert!(atom_sat(&atom("base/example[shaders]"), &atom("base/example-1.0")));
    }
}
