#![deny(warnings)]
//! rewrite: the three canonical passes on top of `expr_core`'s raw
//! constructors.
//!
//! - [`reduce`] folds constants and collects like terms (`2x+3x -> 5x`,
//!   `x*x -> x^2`).
//! - [`sort`] imposes a canonical operand order on `Add`/`Mul` nodes so that
//!   structurally-equal-after-reordering expressions intern to the same
//!   handle once both are sorted.
//! - [`expand`] distributes `Mul` over `Add` (Cartesian product of terms); it
//!   never expands `Pow` of a sum (`(a+b)^n` is left folded).
//!
//! None of the three are implicit in `Store`'s constructors. `reduce` ends by
//! calling `sort` on its own result, so it already hands back a canonical
//! handle; callers compose the rest explicitly, typically
//! `reduce(store, expand(store, id))`.

use expr_core::{to_string, ExprId, Op, Payload, PrintPolicies, Store};
use std::collections::HashMap;

/// `|coeff| < this` drops an additive term (spec: the threshold `reduce`
/// uses to decide a collected coefficient is noise from float accumulation).
const ADD_COEFF_EPS: f64 = 1e-9;
/// `|value| < this` on a ground multiplicative factor short-circuits the
/// whole product to `Constant(0)`.
const MUL_ZERO_EPS: f64 = 1e-10;
/// Tolerance for comparing the folded `global_coeff` of a product against 1.
const MUL_COEFF_EPS: f64 = 1e-9;
/// Tolerance for comparing a collected exponent (or a ground base) against 0
/// or 1 during multiplication reduction.
const MUL_EXPONENT_EPS: f64 = 1e-9;

fn render_key(store: &Store, id: ExprId) -> String {
    to_string(store, id, &PrintPolicies::default())
}

/// Splits an additive operand into `(coefficient, symbolic part)`. A bare
/// number has no symbolic part; a negated or constant-scaled product has its
/// numeric factor pulled out.
pub fn extract_term(store: &mut Store, id: ExprId) -> (f64, Option<ExprId>) {
    match (&store.get(id).op, &store.get(id).payload) {
        (Op::Constant, Payload::Constant(v)) => (*v, None),
        (Op::Negation, _) => {
            let child = store.get(id).children[0];
            let (coeff, symbolic) = extract_term(store, child);
            (-coeff, symbolic)
        }
        (Op::Mul, _) => {
            let children = store.get(id).children.clone();
            let mut coeff = 1.0;
            let mut rest = Vec::new();
            for c in children {
                if let (Op::Constant, Payload::Constant(v)) = (&store.get(c).op, &store.get(c).payload) {
                    coeff *= v;
                } else {
                    rest.push(c);
                }
            }
            match rest.len() {
                0 => (coeff, None),
                1 => (coeff, Some(rest[0])),
                _ => (coeff, Some(store.mul(rest))),
            }
        }
        _ => (1.0, Some(id)),
    }
}

/// Splits a multiplicative operand into `(base, exponent, negated)`. Peels
/// one level of `Negation` (tracked in `negated`), then unwraps a `Pow` with
/// a constant exponent; everything else is itself to the first power.
pub fn extract_products(store: &mut Store, id: ExprId) -> (ExprId, f64, bool) {
    let (id, negated) = match store.get(id).op {
        Op::Negation => (store.get(id).children[0], true),
        _ => (id, false),
    };
    if let Op::Pow = store.get(id).op {
        let base = store.get(id).children[0];
        let exponent = store.get(id).children[1];
        if let (Op::Constant, Payload::Constant(v)) = (&store.get(exponent).op, &store.get(exponent).payload) {
            return (base, *v, negated);
        }
    }
    (id, 1.0, negated)
}

/// Degree used to order `Add` operands: the largest exponent appearing
/// anywhere below `id`, taking the max over both `Add` and `Mul` operands
/// (so `x*y^2` has degree 2, the larger of its two factors' degrees).
fn degree(store: &Store, id: ExprId) -> f64 {
    match store.get(id).op {
        Op::Constant => 0.0,
        Op::Symbol => 1.0,
        Op::Function => 1.0,
        Op::Negation => degree(store, store.get(id).children[0]),
        Op::Pow => {
            let base = store.get(id).children[0];
            let exponent = store.get(id).children[1];
            let exp_val = match &store.get(exponent).payload {
                Payload::Constant(v) => *v,
                _ => 1.0,
            };
            degree(store, base) * exp_val
        }
        Op::Add => store.get(id).children.iter().map(|&c| degree(store, c)).fold(0.0, f64::max),
        Op::Mul => store.get(id).children.iter().map(|&c| degree(store, c)).fold(0.0, f64::max),
    }
}

/// The exponent `id` carries directly, ignoring anything nested below a
/// product factor. Used by `Mul`'s sort comparator, which (unlike `Add`'s)
/// does not look inside compound operands.
fn direct_exponent(store: &Store, id: ExprId) -> f64 {
    if let Op::Pow = store.get(id).op {
        if let Payload::Constant(v) = &store.get(store.get(id).children[1]).payload {
            return *v;
        }
    }
    if let Op::Symbol = store.get(id).op {
        return 1.0;
    }
    0.0
}

/// Folds constants and collects like terms throughout the tree rooted at
/// `id`. Children are reduced before their parent, so a single bottom-up
/// pass reaches a fixed point.
pub fn reduce(store: &mut Store, id: ExprId) -> ExprId {
    match store.get(id).op {
        Op::Symbol => id,
        Op::Constant => id,
        Op::Negation => {
            let child = reduce(store, store.get(id).children[0]);
            match (&store.get(child).op, &store.get(child).payload) {
                (Op::Constant, Payload::Constant(v)) => store.constant(-v),
                (Op::Negation, _) => store.get(child).children[0],
                _ => store.negate(child),
            }
        }
        Op::Add => reduce_add(store, id),
        Op::Mul => reduce_mul(store, id),
        Op::Pow => reduce_pow(store, id),
        Op::Function => {
            let args: Vec<ExprId> = store.get(id).children.clone();
            let reduced_args: Vec<ExprId> = args.into_iter().map(|a| reduce(store, a)).collect();
            let fid = match &store.get(id).payload {
                Payload::Function(fid) => *fid,
                _ => unreachable!("Function node always carries a Payload::Function"),
            };
            store.func(fid, reduced_args)
        }
    }
}

fn reduce_add(store: &mut Store, id: ExprId) -> ExprId {
    let children: Vec<ExprId> = store.get(id).children.clone();
    let reduced: Vec<ExprId> = children.into_iter().map(|c| reduce(store, c)).collect();

    let mut constant_total = 0.0;
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (f64, ExprId)> = HashMap::new();

    for operand in reduced {
        let (coeff, symbolic) = extract_term(store, operand);
        match symbolic {
            None => constant_total += coeff,
            Some(symbolic) => {
                let canonical = sort(store, symbolic);
                let key = render_key(store, canonical);
                groups
                    .entry(key.clone())
                    .and_modify(|(c, _)| *c += coeff)
                    .or_insert_with(|| {
                        order.push(key);
                        (coeff, canonical)
                    });
            }
        }
    }

    let mut result: Vec<ExprId> = Vec::new();
    for key in order {
        let (coeff, symbolic) = groups[&key];
        if coeff.abs() < ADD_COEFF_EPS {
            continue;
        }
        if (coeff - 1.0).abs() < ADD_COEFF_EPS {
            result.push(symbolic);
        } else {
            let c = store.constant(coeff);
            result.push(store.mul([c, symbolic]));
        }
    }
    if constant_total.abs() >= ADD_COEFF_EPS || result.is_empty() {
        result.push(store.constant(constant_total));
    }
    let added = store.add(result);
    sort(store, added)
}

fn reduce_mul(store: &mut Store, id: ExprId) -> ExprId {
    let children: Vec<ExprId> = store.get(id).children.clone();
    let reduced: Vec<ExprId> = children.into_iter().map(|c| reduce(store, c)).collect();

    let mut global_coeff = 1.0;
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (f64, ExprId)> = HashMap::new();

    for operand in reduced {
        if let (Op::Constant, Payload::Constant(v)) = (&store.get(operand).op, &store.get(operand).payload) {
            if v.abs() < MUL_ZERO_EPS {
                return store.constant(0.0);
            }
            global_coeff *= v;
            continue;
        }
        let (base, exponent, negated) = extract_products(store, operand);
        if negated {
            global_coeff *= -1.0;
        }
        let canonical_base = sort(store, base);
        let key = render_key(store, canonical_base);
        groups
            .entry(key.clone())
            .and_modify(|(e, _)| *e += exponent)
            .or_insert_with(|| {
                order.push(key);
                (exponent, canonical_base)
            });
    }

    // Contributions are assembled as one list: the folded coefficient's
    // magnitude (unless it is ~1) followed by each base^exponent. The sign
    // is applied once, at the end, as a `Negation` wrapping the whole thing.
    let mut contributions: Vec<ExprId> = Vec::new();
    if (global_coeff.abs() - 1.0).abs() > MUL_COEFF_EPS {
        contributions.push(store.constant(global_coeff.abs()));
    }
    for key in order {
        let (exponent, base) = groups[&key];
        let base_is_one =
            matches!(&store.get(base).payload, Payload::Constant(v) if (v - 1.0).abs() < MUL_EXPONENT_EPS);
        if exponent.abs() < MUL_EXPONENT_EPS || base_is_one {
            continue;
        }
        if (exponent - 1.0).abs() < MUL_EXPONENT_EPS {
            contributions.push(base);
        } else {
            let e = store.constant(exponent);
            contributions.push(store.pow(base, e));
        }
    }

    let node = match contributions.len() {
        0 => store.constant(1.0),
        1 => contributions[0],
        _ => store.mul(contributions),
    };
    let node = if global_coeff < 0.0 { store.negate(node) } else { node };
    sort(store, node)
}

fn reduce_pow(store: &mut Store, id: ExprId) -> ExprId {
    let base = reduce(store, store.get(id).children[0]);
    let exponent = reduce(store, store.get(id).children[1]);

    if let (Op::Constant, Payload::Constant(v)) = (&store.get(exponent).op, &store.get(exponent).payload) {
        if *v == 0.0 {
            return store.constant(1.0);
        }
        if *v == 1.0 {
            return base;
        }
        if let (Op::Constant, Payload::Constant(b)) = (&store.get(base).op, &store.get(base).payload) {
            if *b == 0.0 && *v > 0.0 {
                return store.constant(0.0);
            }
            // Two ground operands otherwise stay folded as `Pow`: a bare
            // `ground^ground` is not evaluated here, only by `eval`.
            let _ = b;
        }
        if let Op::Pow = store.get(base).op {
            let inner_base = store.get(base).children[0];
            let inner_exp = store.get(base).children[1];
            if let (Op::Constant, Payload::Constant(e2)) = (&store.get(inner_exp).op, &store.get(inner_exp).payload) {
                let combined = store.constant(v * e2);
                return store.pow(inner_base, combined);
            }
        }
    }
    store.pow(base, exponent)
}

/// Imposes the canonical operand order on every `Add`/`Mul` in the tree
/// rooted at `id`. `Add` operands sort symbolic-before-ground, by descending
/// degree, then by rendered length and lexicographic order of the symbolic
/// part. `Mul` operands sort ground-before-symbolic, by descending direct
/// exponent, then by rendered length and lexicographic order of the whole
/// operand.
pub fn sort(store: &mut Store, id: ExprId) -> ExprId {
    match store.get(id).op {
        Op::Symbol | Op::Constant => id,
        Op::Negation => {
            let child = sort(store, store.get(id).children[0]);
            store.negate(child)
        }
        Op::Pow => {
            let base = sort(store, store.get(id).children[0]);
            let exponent = sort(store, store.get(id).children[1]);
            store.pow(base, exponent)
        }
        Op::Function => {
            let fid = match &store.get(id).payload {
                Payload::Function(fid) => *fid,
                _ => unreachable!("Function node always carries a Payload::Function"),
            };
            let args: Vec<ExprId> = store.get(id).children.clone();
            let sorted_args: Vec<ExprId> = args.into_iter().map(|a| sort(store, a)).collect();
            store.func(fid, sorted_args)
        }
        Op::Add => {
            let children: Vec<ExprId> = store.get(id).children.clone();
            let mut sorted: Vec<ExprId> = children.into_iter().map(|c| sort(store, c)).collect();
            sorted.sort_by(|&a, &b| add_key(store, a).cmp(&add_key(store, b)));
            store.add(sorted)
        }
        Op::Mul => {
            let children: Vec<ExprId> = store.get(id).children.clone();
            let mut sorted: Vec<ExprId> = children.into_iter().map(|c| sort(store, c)).collect();
            sorted.sort_by(|&a, &b| mul_key(store, a).cmp(&mul_key(store, b)));
            store.mul(sorted)
        }
    }
}

type SortKey = (bool, i64, usize, String);

fn add_key(store: &mut Store, id: ExprId) -> SortKey {
    let ground = expr_core::is_ground(store, id);
    let (_, symbolic) = extract_term(store, id);
    let text = match symbolic {
        Some(s) => render_key(store, s),
        None => String::new(),
    };
    let neg_degree = -(degree(store, id) * 1_000_000.0) as i64;
    (ground, neg_degree, text.len(), text)
}

fn mul_key(store: &mut Store, id: ExprId) -> SortKey {
    let ground = !expr_core::is_ground(store, id);
    let text = render_key(store, id);
    let neg_exponent = -(direct_exponent(store, id) * 1_000_000.0) as i64;
    (ground, neg_exponent, text.len(), text)
}

/// Distributes `Mul` over `Add` (full Cartesian product of terms) throughout
/// the tree rooted at `id`. `Pow` of a sum is left unexpanded; only its base
/// and exponent are recursively expanded.
pub fn expand(store: &mut Store, id: ExprId) -> ExprId {
    match store.get(id).op {
        Op::Symbol | Op::Constant => id,
        Op::Negation => {
            let child = expand(store, store.get(id).children[0]);
            store.negate(child)
        }
        Op::Pow => {
            let base = expand(store, store.get(id).children[0]);
            let exponent = expand(store, store.get(id).children[1]);
            store.pow(base, exponent)
        }
        Op::Function => {
            let fid = match &store.get(id).payload {
                Payload::Function(fid) => *fid,
                _ => unreachable!("Function node always carries a Payload::Function"),
            };
            let args: Vec<ExprId> = store.get(id).children.clone();
            let expanded: Vec<ExprId> = args.into_iter().map(|a| expand(store, a)).collect();
            store.func(fid, expanded)
        }
        Op::Add => {
            let children: Vec<ExprId> = store.get(id).children.clone();
            let expanded: Vec<ExprId> = children.into_iter().map(|c| expand(store, c)).collect();
            store.add(expanded)
        }
        Op::Mul => {
            let children: Vec<ExprId> = store.get(id).children.clone();
            let factors: Vec<ExprId> = children.into_iter().map(|c| expand(store, c)).collect();

            let mut combos: Vec<Vec<ExprId>> = vec![Vec::new()];
            for factor in factors {
                let terms: Vec<ExprId> = if let Op::Add = store.get(factor).op {
                    store.get(factor).children.clone()
                } else {
                    vec![factor]
                };
                let mut next = Vec::with_capacity(combos.len() * terms.len());
                for combo in &combos {
                    for &term in &terms {
                        let mut extended = combo.clone();
                        extended.push(term);
                        next.push(extended);
                    }
                }
                combos = next;
            }

            let sum_terms: Vec<ExprId> = combos.into_iter().map(|factors| store.mul(factors)).collect();
            store.add(sum_terms)
        }
    }
}
