//! Canonical textual rendering, parameterised by [`PrintPolicies`].

use crate::functions::name_for_id;
use crate::{priority_of, ExprId, Op, Payload, Store};

/// Spacing/style knobs consumed by the renderer. Field groups mirror §6 of
/// the spec (`sum`, `product`, `power`).
#[derive(Clone, Copy, Debug)]
pub struct PrintPolicies {
    pub sum: SumPolicy,
    pub product: ProductPolicy,
    pub power: PowerPolicy,
}

#[derive(Clone, Copy, Debug)]
pub struct SumPolicy {
    /// Spaces between a `+`/`-` operator and the operand that follows it.
    pub operand_spaces: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct ProductPolicy {
    /// Spaces around a `*` (or around the juxtaposition point when `*` is
    /// omitted).
    pub operand_spaces: usize,
    /// If true, `*` is always printed between operands. If false, it is
    /// omitted whenever neither operand requires it (juxtaposition).
    pub use_stars_for_subexprs: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct PowerPolicy {
    pub operand_spaces_before: usize,
    pub operand_spaces_after: usize,
}

impl Default for PrintPolicies {
    fn default() -> Self {
        PrintPolicies {
            sum: SumPolicy { operand_spaces: 0 },
            product: ProductPolicy { operand_spaces: 0, use_stars_for_subexprs: false },
            power: PowerPolicy { operand_spaces_before: 0, operand_spaces_after: 0 },
        }
    }
}

fn spaces(n: usize) -> String {
    " ".repeat(n)
}

fn is_negative_constant(store: &Store, id: ExprId) -> bool {
    matches!(
        (&store.get(id).op, &store.get(id).payload),
        (Op::Constant, Payload::Constant(v)) if *v < 0.0
    )
}

/// Renders `id` in canonical textual form. `id` is treated as the root (no
/// parent, `first = true`).
pub fn to_string(store: &Store, id: ExprId, policies: &PrintPolicies) -> String {
    render(store, id, None, true, policies)
}

fn render(store: &Store, id: ExprId, parent: Option<ExprId>, first: bool, policies: &PrintPolicies) -> String {
    let node = store.get(id);
    let self_priority = node.priority();
    let parent_priority_greater = parent.map_or(false, |p| store.get(p).priority() > self_priority);

    match (&node.op, &node.payload) {
        (Op::Constant, Payload::Constant(v)) => {
            if let Some(p) = parent {
                if store.get(p).op == Op::Add {
                    return format!("{}", v.abs());
                }
            }
            if !first && *v < 0.0 {
                if let Some(p) = parent {
                    if store.get(p).priority() >= priority_of(&Op::Mul) {
                        return format!("({v})");
                    }
                }
            }
            format!("{v}")
        }
        (Op::Symbol, Payload::Symbol(name)) => name.to_string(),
        (Op::Negation, _) => {
            let child = node.children[0];
            if let Some(p) = parent {
                if store.get(p).op == Op::Add {
                    return render(store, child, Some(id), first, policies);
                }
            }
            let child_str = render(store, child, Some(id), first, policies);
            let needs_parens = !first || parent_priority_greater;
            if needs_parens {
                format!("(-{child_str})")
            } else {
                format!("-{child_str}")
            }
        }
        (Op::Add, _) => {
            let mut s = String::new();
            if parent_priority_greater {
                s.push('(');
            }
            for (i, &op) in node.children.iter().enumerate() {
                let negative_like = matches!(store.get(op).op, Op::Negation) || is_negative_constant(store, op);
                if negative_like {
                    if i == 0 {
                        s.push('-');
                        s.push_str(&render(store, op, Some(id), true, policies));
                    } else {
                        s.push('-');
                        s.push_str(&spaces(policies.sum.operand_spaces));
                        s.push_str(&render(store, op, Some(id), false, policies));
                    }
                } else {
                    if i != 0 {
                        s.push('+');
                        s.push_str(&spaces(policies.sum.operand_spaces));
                    }
                    s.push_str(&render(store, op, Some(id), i == 0, policies));
                }
            }
            if parent_priority_greater {
                s.push(')');
            }
            s
        }
        (Op::Mul, _) => {
            let mut s = String::new();
            if parent_priority_greater {
                s.push('(');
            }
            for (i, &op) in node.children.iter().enumerate() {
                if i != 0 {
                    let is_constant = matches!(store.get(op).op, Op::Constant);
                    if is_constant || policies.product.use_stars_for_subexprs {
                        s.push('*');
                        s.push_str(&spaces(policies.product.operand_spaces));
                    } else {
                        s.push_str(&spaces(policies.product.operand_spaces));
                    }
                }
                s.push_str(&render(store, op, Some(id), i == 0, policies));
            }
            if parent_priority_greater {
                s.push(')');
            }
            s
        }
        (Op::Pow, _) => {
            let base = render(store, node.children[0], Some(id), false, policies);
            let exp = render(store, node.children[1], Some(id), false, policies);
            let core = format!(
                "{base}{}^{}{exp}",
                spaces(policies.power.operand_spaces_before),
                spaces(policies.power.operand_spaces_after)
            );
            if parent_priority_greater {
                format!("({core})")
            } else {
                core
            }
        }
        (Op::Function, Payload::Function(fid)) => {
            let name = name_for_id(*fid).unwrap_or("<unknown>");
            let args: Vec<String> =
                node.children.iter().map(|&a| render(store, a, Some(id), true, policies)).collect();
            format!("{name}({})", args.join(", "))
        }
        _ => unreachable!("every Op/Payload pair is covered above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FunctionId;

    fn default_policies() -> PrintPolicies {
        PrintPolicies::default()
    }

    #[test]
    fn renders_symbols_and_constants() {
        let mut st = Store::new();
        let x = st.symbol("x");
        assert_eq!(to_string(&st, x, &default_policies()), "x");
        let c = st.constant(2.0);
        assert_eq!(to_string(&st, c, &default_policies()), "2");
    }

    #[test]
    fn renders_addition_with_trailing_negative_operand() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let two = st.constant(-2.0);
        let sum = st.add([x, two]);
        assert_eq!(to_string(&st, sum, &default_policies()), "x-2");
    }

    #[test]
    fn renders_leading_negation_without_parens() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let neg = st.negate(x);
        assert_eq!(to_string(&st, neg, &default_policies()), "-x");
    }

    #[test]
    fn renders_negated_sum_wrapped_in_parens() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let y = st.symbol("y");
        let sum = st.add([x, y]);
        let neg = st.negate(sum);
        assert_eq!(to_string(&st, neg, &default_policies()), "-(x+y)");
    }

    #[test]
    fn renders_multiplication_juxtaposed_by_default() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let y = st.symbol("y");
        let prod = st.mul([x, y]);
        assert_eq!(to_string(&st, prod, &default_policies()), "xy");
    }

    #[test]
    fn renders_multiplication_by_a_leading_constant_without_a_star() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let two = st.constant(2.0);
        let prod = st.mul([two, x]);
        assert_eq!(to_string(&st, prod, &default_policies()), "2x");
    }

    #[test]
    fn renders_sum_of_products_with_parens_around_lower_priority_child() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let y = st.symbol("y");
        let sum = st.add([x, y]);
        let two = st.constant(2.0);
        let prod = st.mul([two, sum]);
        assert_eq!(to_string(&st, prod, &default_policies()), "2(x+y)");
    }

    #[test]
    fn renders_power() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let six = st.constant(6.0);
        let pow = st.pow(x, six);
        assert_eq!(to_string(&st, pow, &default_policies()), "x^6");
    }

    #[test]
    fn renders_power_of_sum_with_parens() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let y = st.symbol("y");
        let sum = st.add([x, y]);
        let two = st.constant(2.0);
        let pow = st.pow(sum, two);
        assert_eq!(to_string(&st, pow, &default_policies()), "(x+y)^2");
    }

    #[test]
    fn renders_function_call() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let call = st.func_id(FunctionId::Sin, [x]);
        assert_eq!(to_string(&st, call, &default_policies()), "sin(x)");
    }

    #[test]
    fn power_policy_spacing_is_applied() {
        let mut st = Store::new();
        let x = st.symbol("x");
        let two = st.constant(2.0);
        let pow = st.pow(x, two);
        let mut policies = default_policies();
        policies.power.operand_spaces_before = 1;
        policies.power.operand_spaces_after = 1;
        assert_eq!(to_string(&st, pow, &policies), "x ^ 2");
    }
}
