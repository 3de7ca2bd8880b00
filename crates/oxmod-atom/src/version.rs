//! Mod version parsing and ordering

use std::cmp::Ordering;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::atom::AtomError;

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(
        r"^(?P<components>\d+(?:\.\d+)*)(?P<letter>[a-z])?(?P<suffixes>(?:_(?:alpha|beta|pre|rc|p)\d*)*)(?:-r(?P<revision>\d+))?$"
    )
    .unwrap();
    static ref SUFFIX_RE: Regex = Regex::new(r"_(alpha|beta|pre|rc|p)(\d*)").unwrap();
}

/// Kind of a version suffix, ordered by release precedence.
///
/// `_alpha < _beta < _pre < _rc` sort before a plain release,
/// `_p` (patch level) sorts after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SuffixKind {
    Alpha,
    Beta,
    Pre,
    Rc,
    P,
}

/// Rank of "no suffix at all" when comparing suffix chains of unequal length.
const RELEASE_RANK: u8 = 4;

impl SuffixKind {
    fn rank(self) -> u8 {
        match self {
            SuffixKind::Alpha => 0,
            SuffixKind::Beta => 1,
            SuffixKind::Pre => 2,
            SuffixKind::Rc => 3,
            SuffixKind::P => 5,
        }
    }

}

/// A single `_<kind><number>` version suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Suffix {
    pub kind: SuffixKind,
    pub number: u64,
}

/// A parsed mod version: dotted numeric components, optional trailing
/// letter, suffix chain and revision.
///
/// Examples: `1.0`, `2.3a`, `1.0_beta2`, `0.49-r1`, `3.0_rc1_p2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    components: Vec<u64>,
    letter: Option<char>,
    suffixes: Vec<Suffix>,
    revision: u64,
    raw: String,
}

impl Version {
    /// Parse a version string.
    pub fn parse(input: &str) -> Result<Self, AtomError> {
        let caps = VERSION_RE
            .captures(input)
            .ok_or_else(|| AtomError::InvalidVersion(input.to_string()))?;

        let components = caps["components"]
            .split('.')
            .map(|c| c.parse::<u64>().map_err(|_| AtomError::InvalidVersion(input.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let letter = caps.name("letter").and_then(|m| m.as_str().chars().next());

        let suffixes = SUFFIX_RE
            .captures_iter(caps.name("suffixes").map(|m| m.as_str()).unwrap_or(""))
            .map(|s| {
                let kind = match &s[1] {
                    "alpha" => SuffixKind::Alpha,
                    "beta" => SuffixKind::Beta,
                    "pre" => SuffixKind::Pre,
                    "rc" => SuffixKind::Rc,
                    _ => SuffixKind::P,
                };
                let number = s[2].parse::<u64>().unwrap_or(0);
                Suffix { kind, number }
            })
            .collect();

        let revision = caps
            .name("revision")
            .map(|m| m.as_str().parse::<u64>().unwrap_or(0))
            .unwrap_or(0);

        Ok(Self {
            components,
            letter,
            suffixes,
            revision,
            raw: input.to_string(),
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Compare two versions ignoring their revisions, as the `~` atom
    /// operator does.
    pub fn cmp_ignoring_revision(&self, other: &Version) -> Ordering {
        self.cmp_parts(other)
    }

    fn cmp_parts(&self, other: &Version) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        match self.letter.cmp(&other.letter) {
            Ordering::Equal => {}
            ord => return ord,
        }

        let len = self.suffixes.len().max(other.suffixes.len());
        for i in 0..len {
            let (a_rank, a_num) = self
                .suffixes
                .get(i)
                .map(|s| (s.kind.rank(), s.number))
                .unwrap_or((RELEASE_RANK, 0));
            let (b_rank, b_num) = other
                .suffixes
                .get(i)
                .map(|s| (s.kind.rank(), s.number))
                .unwrap_or((RELEASE_RANK, 0));
            match (a_rank, a_num).cmp(&(b_rank, b_num)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_parts(other)
            .then_with(|| self.revision.cmp(&other.revision))
            // Distinct spellings of an equal version ("1.0" vs "1.00") stay
            // totally ordered so that Ord agrees with the derived Eq.
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for Version {
    type Err = AtomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
