#![deny(warnings)]
//! diff: symbolic differentiation on top of `expr_core` and `rewrite`.
//!
//! [`differentiate`] applies the standard rules (constant, symbol, negation,
//! sum, generalized product, and a dependency-based case split for `Pow`)
//! plus a chain-rule lookup for each builtin function, then always passes
//! the raw result through [`rewrite::reduce`] before returning it.

use expr_core::{depends_on, ExprId, FunctionId, Op, Payload, Store};
use std::fmt;

/// Failure modes of [`differentiate`].
#[derive(Debug, Clone, PartialEq)]
pub enum DiffError {
    /// A `FunctionCall` carried a function id outside the builtin registry,
    /// so no derivative rule is known for it.
    UnknownFunction(u32),
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffError::UnknownFunction(id) => write!(f, "no derivative rule for function id: {id}"),
        }
    }
}

impl std::error::Error for DiffError {}

/// Differentiates `id` with respect to `var` (a `Symbol` handle). The result
/// is reduced before being returned, so callers never see an un-simplified
/// derivative.
pub fn differentiate(store: &mut Store, id: ExprId, var: ExprId) -> Result<ExprId, DiffError> {
    let raw = diff_rec(store, id, var)?;
    Ok(rewrite::reduce(store, raw))
}

fn diff_rec(store: &mut Store, id: ExprId, var: ExprId) -> Result<ExprId, DiffError> {
    match (&store.get(id).op, &store.get(id).payload) {
        (Op::Constant, _) => Ok(store.constant(0.0)),
        (Op::Symbol, _) => Ok(store.constant(if id == var { 1.0 } else { 0.0 })),
        (Op::Negation, _) => {
            let child = store.get(id).children[0];
            let dc = diff_rec(store, child, var)?;
            Ok(store.negate(dc))
        }
        (Op::Add, _) => {
            let children: Vec<ExprId> = store.get(id).children.clone();
            let mut terms = Vec::with_capacity(children.len());
            for c in children {
                terms.push(diff_rec(store, c, var)?);
            }
            Ok(store.add(terms))
        }
        (Op::Mul, _) => diff_product(store, id, var),
        (Op::Pow, _) => diff_power(store, id, var),
        (Op::Function, Payload::Function(fid)) => {
            let f = FunctionId::from_u32(*fid).ok_or(DiffError::UnknownFunction(*fid))?;
            let arg = store.get(id).children[0];
            let d_outer = function_derivative(store, f, arg);
            let d_inner = diff_rec(store, arg, var)?;
            Ok(store.mul([d_outer, d_inner]))
        }
        _ => unreachable!("every Op/Payload pair is covered above"),
    }
}

/// `d/dx (f1*f2*...*fn) = sum_i (d fi) * (product of the other fj)`.
fn diff_product(store: &mut Store, id: ExprId, var: ExprId) -> Result<ExprId, DiffError> {
    let factors: Vec<ExprId> = store.get(id).children.clone();
    let mut terms = Vec::with_capacity(factors.len());
    for i in 0..factors.len() {
        let d_i = diff_rec(store, factors[i], var)?;
        let mut rest: Vec<ExprId> = Vec::with_capacity(factors.len());
        rest.push(d_i);
        for (j, &fj) in factors.iter().enumerate() {
            if j != i {
                rest.push(fj);
            }
        }
        terms.push(store.mul(rest));
    }
    Ok(store.add(terms))
}

/// `Pow(base, exponent)` case split on which side depends on `var`:
/// - exponent independent of `var`: classic power rule `n * base^(n-1) * base'`.
/// - base independent of `var`: exponential rule `base^exp * ln(base) * exp'`.
/// - both depend on `var`: full logarithmic-differentiation rule.
fn diff_power(store: &mut Store, id: ExprId, var: ExprId) -> Result<ExprId, DiffError> {
    let base = store.get(id).children[0];
    let exponent = store.get(id).children[1];
    let base_depends = depends_on(store, base, var);
    let exp_depends = depends_on(store, exponent, var);

    if !exp_depends {
        let d_base = diff_rec(store, base, var)?;
        let minus_one = store.constant(-1.0);
        let n_minus_1 = store.add([exponent, minus_one]);
        let reduced_power = store.pow(base, n_minus_1);
        Ok(store.mul([exponent, reduced_power, d_base]))
    } else if !base_depends {
        let d_exp = diff_rec(store, exponent, var)?;
        let ln_base = store.func_id(FunctionId::Ln, [base]);
        Ok(store.mul([id, ln_base, d_exp]))
    } else {
        let d_base = diff_rec(store, base, var)?;
        let d_exp = diff_rec(store, exponent, var)?;
        let ln_base = store.func_id(FunctionId::Ln, [base]);
        let first = store.mul([d_exp, ln_base]);
        let numerator = store.mul([exponent, d_base]);
        let ratio = store.div(numerator, base);
        let bracket = store.add([first, ratio]);
        Ok(store.mul([id, bracket]))
    }
}

/// `d/du f(u)` for each builtin, independent of the chain-rule factor `du`
/// (multiplied in by the caller). `abs' = u'` (the sign factor is dropped)
/// is a known, deliberate simplification rather than an oversight.
fn function_derivative(store: &mut Store, f: FunctionId, arg: ExprId) -> ExprId {
    let one = store.constant(1.0);
    let two = store.constant(2.0);
    match f {
        FunctionId::Cos => {
            let s = store.func_id(FunctionId::Sin, [arg]);
            store.negate(s)
        }
        FunctionId::Sin => store.func_id(FunctionId::Cos, [arg]),
        FunctionId::Tan => {
            let c = store.func_id(FunctionId::Cos, [arg]);
            let c2 = store.pow(c, two);
            store.div(one, c2)
        }
        FunctionId::Acos => {
            let arg2 = store.pow(arg, two);
            let neg_arg2 = store.negate(arg2);
            let one_minus = store.add([one, neg_arg2]);
            let root = store.func_id(FunctionId::Sqrt, [one_minus]);
            let ratio = store.div(one, root);
            store.negate(ratio)
        }
        FunctionId::Asin => {
            let arg2 = store.pow(arg, two);
            let neg_arg2 = store.negate(arg2);
            let one_minus = store.add([one, neg_arg2]);
            let root = store.func_id(FunctionId::Sqrt, [one_minus]);
            store.div(one, root)
        }
        FunctionId::Atan => {
            let arg2 = store.pow(arg, two);
            let denom = store.add([one, arg2]);
            store.div(one, denom)
        }
        FunctionId::Exp => store.func_id(FunctionId::Exp, [arg]),
        FunctionId::Ln => store.div(one, arg),
        FunctionId::Log10 => {
            let ten = store.constant(10.0);
            let ln_ten = store.func_id(FunctionId::Ln, [ten]);
            let denom = store.mul([arg, ln_ten]);
            store.div(one, denom)
        }
        FunctionId::Cosh => store.func_id(FunctionId::Sinh, [arg]),
        FunctionId::Sinh => store.func_id(FunctionId::Cosh, [arg]),
        FunctionId::Tanh => {
            let t = store.func_id(FunctionId::Tanh, [arg]);
            let t2 = store.pow(t, two);
            let neg_t2 = store.negate(t2);
            store.add([one, neg_t2])
        }
        FunctionId::Sqrt => {
            let root = store.func_id(FunctionId::Sqrt, [arg]);
            let denom = store.mul([two, root]);
            store.div(one, denom)
        }
        FunctionId::Abs => one,
    }
}
