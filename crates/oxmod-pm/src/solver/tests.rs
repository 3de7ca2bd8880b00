//! Formula compiler integration tests
//!
//! These validate the compiled CNF against a brute-force model enumerator
//! and a reference evaluator for USE-conditional expressions: the formula
//! must be satisfiable exactly when the source constraints are.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use oxmod_atom::Atom;

use super::*;
use crate::package::Package;
use crate::profile::Profile;
use crate::repository::PackageRepository;
use crate::usestr::{parse_usestr, Expr, Group, GroupKind};

fn atom(s: &str) -> Atom {
    Atom::parse(s).unwrap()
}

/// Helper to create a package with dependencies and REQUIRED_USE
fn pkg(atom_str: &str) -> Package {
    Package::new(atom(atom_str))
}

/// Every distinct unsigned token appearing in the formula, in first-seen
/// order.
fn formula_tokens(formula: &Formula) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for clause in formula.clauses() {
        for literal in &clause.literals {
            let base = unsigned(literal).to_string();
            if seen.insert(base.clone()) {
                tokens.push(base);
            }
        }
    }
    tokens
}

fn literal_holds(literal: &str, assignment: &HashMap<String, bool>) -> bool {
    let value = assignment.get(unsigned(literal)).copied().unwrap_or(false);
    if is_negated(literal) {
        !value
    } else {
        value
    }
}

fn clause_holds(clause: &Clause, assignment: &HashMap<String, bool>) -> bool {
    if let Some(bound) = clause.atmost_bound() {
        let true_count = clause
            .literals
            .iter()
            .filter(|l| literal_holds(l, assignment))
            .count();
        return true_count <= bound;
    }
    clause.literals.iter().any(|l| literal_holds(l, assignment))
}

/// Brute-force satisfiability of the hard clauses with some tokens fixed.
/// Soft clauses are preferences and do not affect satisfiability.
fn satisfiable(formula: &Formula, fixed: &[(&str, bool)]) -> bool {
    let fixed_map: HashMap<String, bool> = fixed
        .iter()
        .map(|(token, value)| (token.to_string(), *value))
        .collect();
    let free: Vec<String> = formula_tokens(formula)
        .into_iter()
        .filter(|t| !fixed_map.contains_key(t))
        .collect();
    assert!(free.len() <= 16, "brute-force enumeration is meant for small formulas");

    for bits in 0..(1u32 << free.len()) {
        let mut assignment = fixed_map.clone();
        for (i, token) in free.iter().enumerate() {
            assignment.insert(token.clone(), bits & (1 << i) != 0);
        }
        let ok = formula
            .clauses()
            .iter()
            .filter(|c| c.weight().is_none())
            .all(|c| clause_holds(c, &assignment));
        if ok {
            return true;
        }
    }
    false
}

/// Reference evaluator for USE-conditional expressions over a flag set.
fn eval_exprs(exprs: &[Expr], flags: &HashSet<String>) -> bool {
    exprs.iter().all(|e| eval_expr(e, flags))
}

fn eval_expr(expr: &Expr, flags: &HashSet<String>) -> bool {
    match expr {
        Expr::Token(token) => match token.strip_prefix('-') {
            Some(flag) => !flags.contains(flag),
            None => flags.contains(token.as_str()),
        },
        Expr::Group(group) => {
            let holding = || group.children.iter().filter(|c| eval_expr(c, flags)).count();
            match &group.kind {
                GroupKind::All => group.children.iter().all(|c| eval_expr(c, flags)),
                GroupKind::AnyOf => group.children.iter().any(|c| eval_expr(c, flags)),
                GroupKind::ExactlyOne => holding() == 1,
                GroupKind::AtMostOne => holding() <= 1,
                GroupKind::Conditional { flag, enabled } => {
                    if flags.contains(flag) == *enabled {
                        group.children.iter().all(|c| eval_expr(c, flags))
                    } else {
                        true
                    }
                }
            }
        }
    }
}

/// Check required-use/CNF equivalence for one expression over a flag
/// universe: for every assignment, the expression holds iff the compiled
/// formula is satisfiable with the owner selected and the flags fixed.
fn check_required_use_equivalence(exprs: &[Expr], universe: &[&str]) {
    let owner = atom("base/owner-1.0");
    let owner_token = owner.to_string();
    let mut vars = VariableIndex::new();
    let formula = RequiredUseCompiler::new(&owner, &mut vars).compile(exprs);

    for bits in 0..(1u32 << universe.len()) {
        let flags: HashSet<String> = universe
            .iter()
            .enumerate()
            .filter(|(i, _)| bits & (1 << i) != 0)
            .map(|(_, f)| f.to_string())
            .collect();

        let mut fixed: Vec<(String, bool)> = vec![(owner_token.clone(), true)];
        for &flag in universe {
            fixed.push((flag_token(&owner_token, flag), flags.contains(flag)));
        }
        let fixed_refs: Vec<(&str, bool)> = fixed.iter().map(|(t, v)| (t.as_str(), *v)).collect();

        let expected = eval_exprs(exprs, &flags);
        let actual = satisfiable(&formula, &fixed_refs);
        assert_eq!(
            expected, actual,
            "mismatch for flags {flags:?} on expression {exprs:?}"
        );

        // Deselecting the owner makes the constraint vacuous.
        let mut deselected = fixed_refs.clone();
        deselected[0] = (owner_token.as_str(), false);
        assert!(satisfiable(&formula, &deselected));
    }
}

// ============================================================================
// Required-use / CNF equivalence
// ============================================================================

#[test]
fn test_required_use_equivalence_basic() {
    for (input, universe) in [
        ("x", vec!["x"]),
        ("-x", vec!["x"]),
        ("x y", vec!["x", "y"]),
        ("x? ( y )", vec!["x", "y"]),
        ("!x? ( y )", vec!["x", "y"]),
        ("|| ( x y )", vec!["x", "y"]),
        ("^^ ( x y z )", vec!["x", "y", "z"]),
        ("?? ( x y z )", vec!["x", "y", "z"]),
        ("x? ( || ( y z ) )", vec!["x", "y", "z"]),
        ("|| ( x ( y z ) )", vec!["x", "y", "z"]),
        ("x? ( y? ( z ) )", vec!["x", "y", "z"]),
        ("|| ( -x y )", vec!["x", "y"]),
    ] {
        let exprs = parse_usestr(input).unwrap();
        check_required_use_equivalence(&exprs, &universe);
    }
}

#[test]
fn test_required_use_equivalence_fuzz() {
    const FLAGS: [&str; 4] = ["a", "b", "c", "d"];
    let mut rng = StdRng::seed_from_u64(0x0dd5eed);

    for _ in 0..40 {
        let count = rng.gen_range(1..=3);
        let exprs: Vec<Expr> = (0..count).map(|_| random_expr(&mut rng, 2)).collect();
        check_required_use_equivalence(&exprs, &FLAGS);
    }
}

fn random_expr(rng: &mut StdRng, depth: u32) -> Expr {
    const FLAGS: [&str; 4] = ["a", "b", "c", "d"];
    if depth == 0 || rng.gen_bool(0.4) {
        let flag = FLAGS[rng.gen_range(0..FLAGS.len())];
        if rng.gen_bool(0.25) {
            return Expr::Token(format!("-{flag}"));
        }
        return Expr::Token(flag.to_string());
    }

    let kind = match rng.gen_range(0..5) {
        0 => GroupKind::All,
        1 => GroupKind::AnyOf,
        2 => GroupKind::ExactlyOne,
        3 => GroupKind::AtMostOne,
        _ => GroupKind::Conditional {
            flag: FLAGS[rng.gen_range(0..FLAGS.len())].to_string(),
            enabled: rng.gen_bool(0.5),
        },
    };
    // Choice groups aggregate their members one-directionally, so exactly-one
    // and at-most-one carry flat flag members, as REQUIRED_USE does in
    // practice.
    let flat = matches!(kind, GroupKind::ExactlyOne | GroupKind::AtMostOne);
    let children: Vec<Expr> = (0..rng.gen_range(1..=3))
        .map(|_| {
            if flat {
                random_expr(rng, 0)
            } else {
                random_expr(rng, depth - 1)
            }
        })
        .collect();
    Expr::Group(Group { kind, children })
}

// ============================================================================
// At-most-one encoding
// ============================================================================

#[test]
fn test_atmost_one_models() {
    let tokens: Vec<Token> = ["a", "b", "c"].iter().map(|t| t.to_string()).collect();
    let mut formula = Formula::new();
    for pair in get_atmost_one_formulae(&tokens) {
        formula.push(Clause::meta(pair.to_vec(), "test"));
    }

    for bits in 0..8u32 {
        let fixed: Vec<(&str, bool)> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), bits & (1 << i) != 0))
            .collect();
        let true_count = fixed.iter().filter(|(_, v)| *v).count();
        assert_eq!(satisfiable(&formula, &fixed), true_count <= 1);
    }
}

// ============================================================================
// End-to-end compilation
// ============================================================================

fn simple_universe() -> PackageRepository {
    let mut repo = PackageRepository::new();
    repo.add_package(pkg("base/a-1.0").with_depend("base/b"));
    repo.add_package(
        pkg("base/b-1.0")
            .with_required_use("x? ( y )")
            .with_iuse(["x", "y"]),
    );
    repo
}

#[test]
fn test_end_to_end_required_use_propagates() {
    let repo = simple_universe();
    let profile = Profile::new();
    let mut compiler = FormulaCompiler::new(&repo, &profile);

    let mut request = Request::new();
    request.install(atom("base/a"));
    let formula = compiler.compile(&request).unwrap();

    // Selecting everything with x implying y is fine.
    assert!(satisfiable(
        &formula,
        &[
            ("base/a-1.0", true),
            ("base/b-1.0", true),
            ("base/b-1.0[x]", true),
            ("base/b-1.0[y]", true),
        ],
    ));
    // x without y violates b's constraint.
    assert!(!satisfiable(
        &formula,
        &[
            ("base/a-1.0", true),
            ("base/b-1.0", true),
            ("base/b-1.0[x]", true),
            ("base/b-1.0[y]", false),
        ],
    ));
    // x disabled leaves y free.
    assert!(satisfiable(
        &formula,
        &[
            ("base/a-1.0", true),
            ("base/b-1.0", true),
            ("base/b-1.0[x]", false),
            ("base/b-1.0[y]", false),
        ],
    ));
    // The request makes a mandatory, and a drags b in.
    assert!(!satisfiable(&formula, &[("base/a-1.0", false)]));
    assert!(!satisfiable(&formula, &[("base/a-1.0", true), ("base/b-1.0", false)]));
}

#[test]
fn test_cycle_terminates() {
    let mut repo = PackageRepository::new();
    repo.add_package(pkg("base/a-1.0").with_depend("base/b"));
    repo.add_package(pkg("base/b-1.0").with_rdepend("base/a"));
    let profile = Profile::new();
    let mut compiler = FormulaCompiler::new(&repo, &profile);

    let mut request = Request::new();
    request.install(atom("base/a"));
    let formula = compiler.compile(&request).unwrap();

    // Request clause plus one dependency clause per package; each package
    // was compiled exactly once.
    assert_eq!(formula.len(), 3);
    assert_eq!(formula.atoms().len(), 2);
    assert!(formula.atoms().contains_key("base/a"));
    assert!(formula.atoms().contains_key("base/b"));

    assert!(satisfiable(&formula, &[("base/a-1.0", true), ("base/b-1.0", true)]));
    assert!(!satisfiable(&formula, &[("base/a-1.0", true), ("base/b-1.0", false)]));
}

#[test]
fn test_blocker_excludes_candidates() {
    let mut repo = PackageRepository::new();
    repo.add_package(pkg("base/a-1.0").with_depend("!!base/c"));
    repo.add_package(pkg("base/b-1.0").with_depend("base/c"));
    repo.add_package(pkg("base/c-1.0"));
    let profile = Profile::new();
    let mut compiler = FormulaCompiler::new(&repo, &profile);

    let mut request = Request::new();
    request.install(atom("base/a"));
    request.install(atom("base/b"));
    let formula = compiler.compile(&request).unwrap();

    // a excludes c while b needs it: both targets can never hold at once.
    assert!(!satisfiable(&formula, &[]));

    // The conflict is attributable from provenance under the candidate
    // model that selects both owners.
    let model: HashSet<Token> =
        ["base/a-1.0", "base/b-1.0"].iter().map(|t| t.to_string()).collect();
    let conflicts = find_conflicts(&formula, &model);
    assert!(!conflicts.is_empty());
}

#[test]
fn test_texture_sizes_are_exclusive() {
    let mut repo = PackageRepository::new();
    repo.add_package(pkg("gfx/pack-1.0").with_texture_sizes(["512", "1024"]));
    let profile = Profile::new();
    let mut compiler = FormulaCompiler::new(&repo, &profile);

    let mut request = Request::new();
    request.install(atom("gfx/pack"));
    let formula = compiler.compile(&request).unwrap();

    let selected = ("gfx/pack-1.0", true);
    assert!(satisfiable(
        &formula,
        &[selected, ("gfx/pack-1.0[texture_size_512]", true), ("gfx/pack-1.0[texture_size_1024]", false)],
    ));
    assert!(!satisfiable(
        &formula,
        &[selected, ("gfx/pack-1.0[texture_size_512]", true), ("gfx/pack-1.0[texture_size_1024]", true)],
    ));
    assert!(!satisfiable(
        &formula,
        &[selected, ("gfx/pack-1.0[texture_size_512]", false), ("gfx/pack-1.0[texture_size_1024]", false)],
    ));
}

#[test]
fn test_request_use_deps_constrain_candidates() {
    let mut repo = PackageRepository::new();
    repo.add_package(pkg("base/a-1.0").with_iuse(["x"]));
    let profile = Profile::new();
    let mut compiler = FormulaCompiler::new(&repo, &profile);

    let mut request = Request::new();
    request.install(atom("base/a[x]"));
    let formula = compiler.compile(&request).unwrap();

    assert!(satisfiable(&formula, &[("base/a-1.0", true), ("base/a-1.0[x]", true)]));
    assert!(!satisfiable(&formula, &[("base/a-1.0", true), ("base/a-1.0[x]", false)]));
}

#[test]
fn test_forced_use_constrains_model() {
    let mut repo = PackageRepository::new();
    repo.add_package(pkg("base/a-1.0").with_required_use("x? ( y )").with_iuse(["x", "y"]));
    let mut profile = Profile::new();
    profile.force_use(atom("base/a"), ["x"]);
    let mut compiler = FormulaCompiler::new(&repo, &profile);

    let mut request = Request::new();
    request.install(atom("base/a"));
    let formula = compiler.compile(&request).unwrap();

    // x is forced on, so y must follow whenever a is selected.
    assert!(!satisfiable(
        &formula,
        &[("base/a-1.0", true), ("base/a-1.0[y]", false)],
    ));
    assert!(satisfiable(
        &formula,
        &[("base/a-1.0", true), ("base/a-1.0[y]", true)],
    ));
    // Forced flags are unconditional: they hold even with a deselected.
    assert!(!satisfiable(&formula, &[("base/a-1.0[x]", false)]));
}

// ============================================================================
// WCNFPlus conversion
// ============================================================================

#[test]
fn test_wcnfplus_round_trip() {
    let repo = simple_universe();
    let profile = Profile::new();
    let mut compiler = FormulaCompiler::new(&repo, &profile);

    let mut request = Request::new();
    request.install(atom("base/a"));
    let formula = compiler.compile(&request).unwrap();

    let wcnf = formula.get_wcnfplus(compiler.variables_mut());
    assert_eq!(wcnf.hard.len(), formula.len());
    assert!(wcnf.soft.is_empty());
    assert!(wcnf.atmost.is_empty());

    // Every literal round-trips through the index with its sign.
    let vars = compiler.variables();
    for (clause, nums) in formula.clauses().iter().zip(&wcnf.hard) {
        for (literal, &num) in clause.literals.iter().zip(nums) {
            assert_ne!(num, 0);
            assert_eq!(&vars.getstring(num), literal);
        }
    }
}

#[test]
fn test_wcnfplus_soft_clauses_from_weak_blockers() {
    let mut repo = PackageRepository::new();
    repo.add_package(pkg("base/a-1.0").with_depend("!base/c"));
    repo.add_package(pkg("base/c-1.0"));
    let profile = Profile::new();
    let mut compiler = FormulaCompiler::new(&repo, &profile);

    let mut request = Request::new();
    request.install(atom("base/a"));
    let formula = compiler.compile(&request).unwrap();

    let wcnf = formula.get_wcnfplus(compiler.variables_mut());
    assert_eq!(wcnf.soft.len(), 1);

    // Soft clauses never make the formula unsatisfiable.
    assert!(satisfiable(&formula, &[("base/a-1.0", true), ("base/c-1.0", true)]));
}
