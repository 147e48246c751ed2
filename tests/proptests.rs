#![deny(warnings)]
use proptest::prelude::*;
use symalg::{Env, Library};

proptest! {
    #[test]
    fn reduce_is_idempotent_for_any_linear_combination(a in -20i64..20, b in -20i64..20, c in -20i64..20) {
        let lib = Library::new();
        let x = lib.symbol("x");
        let expr = lib.constant(a as f64) * x.clone() + lib.constant(b as f64) * x + lib.constant(c as f64);
        let once = expr.reduce();
        let twice = once.reduce();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn evaluation_agrees_before_and_after_reduce(
        a in -20i64..20,
        b in -20i64..20,
        xv in -10.0f64..10.0,
    ) {
        let lib = Library::new();
        let x = lib.symbol("x");
        let expr = lib.constant(a as f64) * x.clone() + lib.constant(b as f64) * x.clone();
        let reduced = expr.reduce();

        let mut env = Env::new();
        env.bind("x", xv);
        let before = expr.call(&env).unwrap();
        let after = reduced.call(&env).unwrap();
        prop_assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn addition_is_flatten_associative_regardless_of_grouping(
        a in -50i64..50,
        b in -50i64..50,
        c in -50i64..50,
    ) {
        let lib = Library::new();
        let x = lib.symbol("x");
        let y = lib.symbol("y");
        let z = lib.symbol("z");
        let _ = (a, b, c);
        let left_grouped = (x.clone() + y.clone()) + z.clone();
        let right_grouped = x + (y + z);
        prop_assert_eq!(left_grouped, right_grouped);
    }

    #[test]
    fn differentiating_then_evaluating_matches_a_central_difference(
        coeff in 1i64..10,
        xv in -3.0f64..3.0,
    ) {
        // d/dx (coeff * x^2) should match a central-difference estimate.
        let lib = Library::new();
        let x = lib.symbol("x");
        let x_sq = symalg::pow(x.clone(), lib.constant(2.0));
        let expr = lib.constant(coeff as f64) * x_sq;
        let derivative = expr.differentiate(&x).unwrap();

        let h = 1e-4;
        let mut env_plus = Env::new();
        env_plus.bind("x", xv + h);
        let mut env_minus = Env::new();
        env_minus.bind("x", xv - h);
        let f_plus = expr.call(&env_plus).unwrap();
        let f_minus = expr.call(&env_minus).unwrap();
        let central = (f_plus - f_minus) / (2.0 * h);

        let mut env = Env::new();
        env.bind("x", xv);
        let analytic = derivative.call(&env).unwrap();
        prop_assert!((analytic - central).abs() < 1e-3);
    }

    #[test]
    fn negation_is_its_own_inverse(a in -50i64..50) {
        let lib = Library::new();
        let c = lib.constant(a as f64);
        let double_neg = -(-c.clone());
        prop_assert_eq!(double_neg, c);
    }
}
