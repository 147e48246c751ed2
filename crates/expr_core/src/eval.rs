//! Numeric evaluation and the structural predicates `is_ground`/`depends_on`.

use crate::functions::FunctionId;
use crate::{ExprId, Op, Payload, Store};
use std::collections::HashMap;
use std::fmt;

/// Binds symbol names to real values for [`eval`]. Grounded on `evalf`'s
/// `EvalContext` in the teacher pack.
#[derive(Default, Clone, Debug)]
pub struct Env {
    bindings: HashMap<String, f64>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<S: Into<String>>(&mut self, name: S, value: f64) -> &mut Self {
        self.bindings.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.bindings.get(name).copied()
    }
}

/// Failure modes of [`eval`].
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// `eval` reached a `Symbol` absent from the environment.
    UnboundSymbol(String),
    /// A builtin function call was not given exactly one argument.
    ArityMismatch { function: &'static str, expected: usize, found: usize },
    /// A `FunctionCall` carried a function id outside the builtin registry.
    UnknownFunction(u32),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnboundSymbol(name) => write!(f, "unbound symbol: {name}"),
            EvalError::ArityMismatch { function, expected, found } => {
                write!(f, "{function}: expected {expected} argument(s), found {found}")
            }
            EvalError::UnknownFunction(id) => write!(f, "unknown function id: {id}"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluates `id` under `env`. `Constant(v) -> v`; `Symbol(n) -> env[n]`
/// (errors when absent); `Negation(c) -> -eval(c)`; `Addition -> sum`;
/// `Multiplication -> product`; `Power(b, e) -> b^e`;
/// `FunctionCall(id, args) -> registry[id].eval(args)`.
pub fn eval(store: &Store, id: ExprId, env: &Env) -> Result<f64, EvalError> {
    let node = store.get(id);
    match (&node.op, &node.payload) {
        (Op::Constant, Payload::Constant(v)) => Ok(*v),
        (Op::Symbol, Payload::Symbol(name)) => {
            env.get(name).ok_or_else(|| EvalError::UnboundSymbol(name.to_string()))
        }
        (Op::Negation, _) => Ok(-eval(store, node.children[0], env)?),
        (Op::Add, _) => {
            let mut sum = 0.0;
            for &child in &node.children {
                sum += eval(store, child, env)?;
            }
            Ok(sum)
        }
        (Op::Mul, _) => {
            let mut product = 1.0;
            for &child in &node.children {
                product *= eval(store, child, env)?;
            }
            Ok(product)
        }
        (Op::Pow, _) => {
            let base = eval(store, node.children[0], env)?;
            let exponent = eval(store, node.children[1], env)?;
            Ok(base.powf(exponent))
        }
        (Op::Function, Payload::Function(id)) => eval_function(store, *id, &node.children, env),
        _ => unreachable!("every Op/Payload pair is covered above"),
    }
}

fn eval_function(store: &Store, id: u32, args: &[ExprId], env: &Env) -> Result<f64, EvalError> {
    let f = FunctionId::from_u32(id).ok_or(EvalError::UnknownFunction(id))?;
    if args.len() != 1 {
        return Err(EvalError::ArityMismatch { function: f.name(), expected: 1, found: args.len() });
    }
    let x = eval(store, args[0], env)?;
    Ok(f.eval(x))
}

/// True iff every leaf reachable from `id` is a `Constant` (so any `Symbol`
/// makes the whole expression non-ground).
pub fn is_ground(store: &Store, id: ExprId) -> bool {
    let node = store.get(id);
    match node.op {
        Op::Constant => true,
        Op::Symbol => false,
        Op::Negation | Op::Add | Op::Mul | Op::Pow | Op::Function => {
            node.children.iter().all(|&c| is_ground(store, c))
        }
    }
}

/// True iff `var` appears anywhere in the tree rooted at `id`, checked by
/// handle identity (sound because nodes are interned).
pub fn depends_on(store: &Store, id: ExprId, var: ExprId) -> bool {
    if id == var {
        return true;
    }
    store.get(id).children.iter().any(|&c| depends_on(store, c, var))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_constant_and_symbol() {
        let mut st = Store::new();
        let c = st.constant(2.5);
        assert_eq!(eval(&st, c, &Env::new()).unwrap(), 2.5);

        let x = st.symbol("x");
        let mut env = Env::new();
        env.bind("x", 3.0);
        assert_eq!(eval(&st, x, &env).unwrap(), 3.0);
    }

    #[test]
    fn eval_unbound_symbol_errors() {
        let mut st = Store::new();
        let x = st.symbol("x");
        assert_eq!(eval(&st, x, &Env::new()), Err(EvalError::UnboundSymbol("x".into())));
    }

    #[test]
    fn eval_arithmetic() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let two = st.constant(2.0);
        let three = st.constant(3.0);
        let expr = st.add([st.mul([two, x]), three]);
        let mut env = Env::new();
        env.bind("x", 5.0);
        assert_eq!(eval(&st, expr, &env).unwrap(), 13.0);
    }

    #[test]
    fn eval_negation_and_power() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let two = st.constant(2.0);
        let sq = st.pow(x, two);
        let neg_sq = st.negate(sq);
        let mut env = Env::new();
        env.bind("x", 3.0);
        assert_eq!(eval(&st, neg_sq, &env).unwrap(), -9.0);
    }

    #[test]
    fn eval_function_arity_mismatch() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let y = st.symbol("y");
        let f = st.func(FunctionId::Sin as u32, [x, y]);
        let mut env = Env::new();
        env.bind("x", 1.0);
        env.bind("y", 2.0);
        assert_eq!(
            eval(&st, f, &env),
            Err(EvalError::ArityMismatch { function: "sin", expected: 1, found: 2 })
        );
    }

    #[test]
    fn is_ground_distinguishes_symbols_from_constants() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let two = st.constant(2.0);
        let ground = st.add([two, st.constant(3.0)]);
        let not_ground = st.add([two, x]);
        assert!(is_ground(&st, ground));
        assert!(!is_ground(&st, not_ground));
    }

    #[test]
    fn depends_on_checks_identity_through_the_tree() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let y = st.symbol("y");
        let expr = st.mul([x, st.add([y, st.constant(1.0)])]);
        assert!(depends_on(&st, expr, x));
        assert!(depends_on(&st, expr, y));
        let z = st.symbol("z");
        assert!(!depends_on(&st, expr, z));
    }
}
