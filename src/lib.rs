#![deny(warnings)]
//! symalg: the public `Expression`/`Library` facade over `expr_core`,
//! `rewrite` and `diff`.
//!
//! The three lower crates thread a `Store` through every call explicitly,
//! the way `expr_core`/`rewrite`/`diff` are built. Operator overloading on
//! `Expression` needs somewhere to build nodes without a `Store` argument at
//! every `+`, so `Library` keeps a thread-local "current" pointer that
//! `From<f64>`/`From<&str>` fall back to when converting a bare literal into
//! an `Expression`. It is a thread-local, not a true global, per the
//! explicit refinement allowance for this pattern.

pub use diff::DiffError;
pub use expr_core::{Env, EvalError, FunctionId, PrintPolicies};

use expr_core::{depends_on as depends_on_expr, eval as eval_expr, is_ground as is_ground_expr, to_string as render_expr, ExprId, Op, Store};
use std::cell::RefCell;
use std::fmt;
use std::ops::{Add, Deref, Div, Mul, Neg, Sub};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    static CURRENT: RefCell<Option<Weak<Library>>> = RefCell::new(None);
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Owns a `Store` plus the print policy it renders with. The first `Library`
/// constructed on a thread becomes that thread's current context; later ones
/// do not displace it unless it has already been dropped.
pub struct Library {
    store: RefCell<Store>,
    policies: RefCell<PrintPolicies>,
    generation: u64,
}

impl Library {
    pub fn new() -> Rc<Library> {
        let lib = Rc::new(Library {
            store: RefCell::new(Store::new()),
            policies: RefCell::new(PrintPolicies::default()),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        });
        CURRENT.with(|c| {
            let mut slot = c.borrow_mut();
            let has_live_current = slot.as_ref().and_then(Weak::upgrade).is_some();
            if !has_live_current {
                *slot = Some(Rc::downgrade(&lib));
            }
        });
        lib
    }

    /// The thread-current `Library`, if one is alive.
    pub fn current() -> Option<Rc<Library>> {
        CURRENT.with(|c| c.borrow().as_ref().and_then(Weak::upgrade))
    }

    /// Forces `self` to become the thread-current context, displacing
    /// whatever was installed before.
    pub fn make_current(self: &Rc<Self>) {
        CURRENT.with(|c| *c.borrow_mut() = Some(Rc::downgrade(self)));
    }

    pub fn policies(&self) -> PrintPolicies {
        *self.policies.borrow()
    }

    pub fn set_policies(&self, policies: PrintPolicies) {
        *self.policies.borrow_mut() = policies;
    }

    pub fn symbol(self: &Rc<Self>, name: &str) -> Expression {
        let id = self.store.borrow_mut().symbol(name);
        Expression { library: self.clone(), id }
    }

    pub fn constant(self: &Rc<Self>, value: f64) -> Expression {
        let id = self.store.borrow_mut().constant(value);
        Expression { library: self.clone(), id }
    }

    fn current_or_panic() -> Rc<Library> {
        Self::current().expect(
            "no current Library; construct one with Library::new() before converting a bare literal",
        )
    }
}

/// A handle into a `Library`'s `Store`. Cheap to clone (an `Rc` bump plus a
/// `usize`). Comparing two `Expression`s from different `Library`s is always
/// `false`; combining them with an operator panics in debug builds.
#[derive(Clone)]
pub struct Expression {
    library: Rc<Library>,
    id: ExprId,
}

fn assert_same_library(a: &Expression, b: &Expression) {
    debug_assert!(
        Rc::ptr_eq(&a.library, &b.library),
        "mixed Expression handles: library generations {} and {}",
        a.library.generation,
        b.library.generation
    );
}

impl Expression {
    pub fn library(&self) -> &Rc<Library> {
        &self.library
    }

    /// Evaluates under `env`, failing on an unbound symbol or an unknown
    /// function id.
    pub fn call(&self, env: &Env) -> Result<f64, EvalError> {
        eval_expr(&self.library.store.borrow(), self.id, env)
    }

    /// Evaluates with an empty environment; fails unless the expression is
    /// ground.
    pub fn call0(&self) -> Result<f64, EvalError> {
        self.call(&Env::new())
    }

    pub fn is_ground(&self) -> bool {
        is_ground_expr(&self.library.store.borrow(), self.id)
    }

    pub fn depends_on(&self, other: &Expression) -> bool {
        assert_same_library(self, other);
        depends_on_expr(&self.library.store.borrow(), self.id, other.id)
    }

    pub fn reduce(&self) -> Expression {
        let id = rewrite::reduce(&mut self.library.store.borrow_mut(), self.id);
        Expression { library: self.library.clone(), id }
    }

    pub fn sort(&self) -> Expression {
        let id = rewrite::sort(&mut self.library.store.borrow_mut(), self.id);
        Expression { library: self.library.clone(), id }
    }

    pub fn expand(&self) -> Expression {
        let id = rewrite::expand(&mut self.library.store.borrow_mut(), self.id);
        Expression { library: self.library.clone(), id }
    }

    pub fn differentiate(&self, var: &Expression) -> Result<Expression, DiffError> {
        assert_same_library(self, var);
        let id = diff::differentiate(&mut self.library.store.borrow_mut(), self.id, var.id)?;
        Ok(Expression { library: self.library.clone(), id })
    }

    pub fn to_string_with(&self, policies: &PrintPolicies) -> String {
        render_expr(&self.library.store.borrow(), self.id, policies)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policies = self.library.policies();
        write!(f, "{}", render_expr(&self.library.store.borrow(), self.id, &policies))
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self)
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.library, &other.library) && self.id == other.id
    }
}

impl Eq for Expression {}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Library::current_or_panic().constant(value)
    }
}

impl From<&str> for Expression {
    fn from(name: &str) -> Self {
        Library::current_or_panic().symbol(name)
    }
}

impl<T: Into<Expression>> Add<T> for Expression {
    type Output = Expression;
    fn add(self, rhs: T) -> Expression {
        let rhs = rhs.into();
        assert_same_library(&self, &rhs);
        let id = self.library.store.borrow_mut().add([self.id, rhs.id]);
        Expression { library: self.library.clone(), id }
    }
}

impl<T: Into<Expression>> Sub<T> for Expression {
    type Output = Expression;
    fn sub(self, rhs: T) -> Expression {
        let rhs = rhs.into();
        assert_same_library(&self, &rhs);
        let neg_rhs = self.library.store.borrow_mut().negate(rhs.id);
        let id = self.library.store.borrow_mut().add([self.id, neg_rhs]);
        Expression { library: self.library.clone(), id }
    }
}

impl<T: Into<Expression>> Mul<T> for Expression {
    type Output = Expression;
    fn mul(self, rhs: T) -> Expression {
        let rhs = rhs.into();
        assert_same_library(&self, &rhs);
        let id = self.library.store.borrow_mut().mul([self.id, rhs.id]);
        Expression { library: self.library.clone(), id }
    }
}

impl<T: Into<Expression>> Div<T> for Expression {
    type Output = Expression;
    fn div(self, rhs: T) -> Expression {
        let rhs = rhs.into();
        assert_same_library(&self, &rhs);
        let id = self.library.store.borrow_mut().div(self.id, rhs.id);
        Expression { library: self.library.clone(), id }
    }
}

impl Neg for Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        let id = self.library.store.borrow_mut().negate(self.id);
        Expression { library: self.library.clone(), id }
    }
}

/// `base^exponent`, built in whichever argument's `Library` is live (both
/// must agree if both are already `Expression`s).
pub fn pow<A: Into<Expression>, B: Into<Expression>>(base: A, exponent: B) -> Expression {
    let base = base.into();
    let exponent = exponent.into();
    assert_same_library(&base, &exponent);
    let id = base.library.store.borrow_mut().pow(base.id, exponent.id);
    Expression { library: base.library.clone(), id }
}

macro_rules! unary_builtin {
    ($(#[$doc:meta])* $name:ident, $variant:ident) => {
        $(#[$doc])*
        pub fn $name<T: Into<Expression>>(x: T) -> Expression {
            let x = x.into();
            let id = x.library.store.borrow_mut().func_id(FunctionId::$variant, [x.id]);
            Expression { library: x.library.clone(), id }
        }
    };
}

unary_builtin!(cos, Cos);
unary_builtin!(sin, Sin);
unary_builtin!(tan, Tan);
unary_builtin!(acos, Acos);
unary_builtin!(asin, Asin);
unary_builtin!(atan, Atan);
unary_builtin!(exp, Exp);
unary_builtin!(ln, Ln);
unary_builtin!(log10, Log10);
unary_builtin!(cosh, Cosh);
unary_builtin!(sinh, Sinh);
unary_builtin!(tanh, Tanh);
unary_builtin!(sqrt, Sqrt);
unary_builtin!(abs, Abs);

/// Errors raised by the facade itself, as opposed to evaluation or
/// differentiation.
#[derive(Debug, Clone, PartialEq)]
pub enum FacadeError {
    /// [`Symbol::try_from_expression`] was given a non-`Symbol` expression.
    NotASymbol,
}

impl fmt::Display for FacadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacadeError::NotASymbol => write!(f, "expression is not a bare symbol"),
        }
    }
}

impl std::error::Error for FacadeError {}

/// An `Expression` statically known to be a bare `Symbol`.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol(Expression);

impl Symbol {
    pub fn new(library: &Rc<Library>, name: &str) -> Symbol {
        Symbol(library.symbol(name))
    }

    pub fn try_from_expression(expr: Expression) -> Result<Symbol, FacadeError> {
        let is_symbol = matches!(expr.library.store.borrow().get(expr.id).op, Op::Symbol);
        if is_symbol {
            Ok(Symbol(expr))
        } else {
            Err(FacadeError::NotASymbol)
        }
    }

    pub fn as_expression(&self) -> &Expression {
        &self.0
    }
}

impl Deref for Symbol {
    type Target = Expression;
    fn deref(&self) -> &Expression {
        &self.0
    }
}

impl From<Symbol> for Expression {
    fn from(s: Symbol) -> Expression {
        s.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_and_render_a_polynomial() {
        let lib = Library::new();
        let x = lib.symbol("x");
        let expr = x.clone() * 2.0 + 3.0;
        // Construction only flattens; this is the raw operand order, not a
        // canonicalized one (see `sort`).
        assert_eq!(expr.to_string(), "x*2+3");
    }

    #[test]
    fn operators_compose_with_f64_and_str_literals_via_current_context() {
        let lib = Library::new();
        lib.make_current();
        let x: Expression = "x".into();
        let expr = x + 1.0;
        let reduced = expr.reduce();
        let mut env = Env::new();
        env.bind("x", 4.0);
        assert_eq!(reduced.call(&env).unwrap(), 5.0);
    }

    #[test]
    fn reduce_collects_like_terms_through_the_facade() {
        let lib = Library::new();
        let x = lib.symbol("x");
        let expr = lib.constant(3.0) + x.clone() + lib.constant(10.0);
        let reduced = expr.reduce();
        assert_eq!(reduced.to_string(), "x+13");
        let sorted = reduced.sort();
        assert_eq!(sorted.to_string(), "x+13");
    }

    #[test]
    fn expand_and_reduce_through_the_facade() {
        let lib = Library::new();
        let x = lib.symbol("x");
        let sum = x.clone() + 3.0;
        let expr = lib.constant(2.0) * sum;
        let simplified = expr.expand().reduce().sort();
        assert_eq!(simplified.to_string(), "2x+6");
    }

    #[test]
    fn differentiate_power_through_the_facade() {
        let lib = Library::new();
        let x = lib.symbol("x");
        let expr = pow(x.clone(), lib.constant(6.0));
        let d = expr.differentiate(&x).unwrap();
        let mut env = Env::new();
        env.bind("x", 2.0);
        let got = d.call(&env).unwrap();
        assert!((got - 6.0 * 2.0_f64.powf(5.0)).abs() < 1e-9);
    }

    #[test]
    fn sin_and_cos_round_trip_through_eval() {
        let lib = Library::new();
        let x = lib.symbol("x");
        let expr = sin(x.clone()) * sin(x.clone()) + cos(x.clone()) * cos(x);
        let mut env = Env::new();
        env.bind("x", 0.37);
        let got = expr.call(&env).unwrap();
        assert!((got - 1.0).abs() < 1e-9);
    }

    #[test]
    fn symbol_facade_rejects_non_symbol_expressions() {
        let lib = Library::new();
        let expr = lib.constant(2.0);
        assert_eq!(Symbol::try_from_expression(expr), Err(FacadeError::NotASymbol));
        let x = lib.symbol("x");
        assert!(Symbol::try_from_expression(x).is_ok());
    }

    #[test]
    fn second_library_does_not_displace_a_live_current() {
        let first = Library::new();
        first.make_current();
        let _second = Library::new();
        let current = Library::current().unwrap();
        assert!(Rc::ptr_eq(&first, &current));
    }

    #[test]
    fn expression_equality_is_false_across_distinct_libraries() {
        let lib_a = Library::new();
        let lib_b = Library::new();
        let x_a = lib_a.symbol("x");
        let x_b = lib_b.symbol("x");
        assert_ne!(x_a, x_b);
    }
}
