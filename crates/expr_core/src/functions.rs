//! Builtin unary function registry.
//!
//! Each entry carries a printed name and a numeric evaluator; reduction is
//! the identity on the node itself (the rewrite engine does not fold
//! builtin calls), and the derivative rule lives in the `diff` crate, which
//! dispatches on the same [`FunctionId`].

/// Id of a builtin unary function, `∈ {cos, sin, tan, acos, asin, atan, exp,
/// ln, log10, cosh, sinh, tanh, sqrt, abs}`. `repr(u32)` so it round-trips
/// through `Payload::Function(u32)` without a separate lookup table for the
/// common case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FunctionId {
    Cos = 0,
    Sin = 1,
    Tan = 2,
    Acos = 3,
    Asin = 4,
    Atan = 5,
    Exp = 6,
    Ln = 7,
    Log10 = 8,
    Cosh = 9,
    Sinh = 10,
    Tanh = 11,
    Sqrt = 12,
    Abs = 13,
}

#[allow(dead_code)]
pub(crate) const COUNT: u32 = 14;

impl FunctionId {
    pub fn from_u32(id: u32) -> Option<Self> {
        Some(match id {
            0 => Self::Cos,
            1 => Self::Sin,
            2 => Self::Tan,
            3 => Self::Acos,
            4 => Self::Asin,
            5 => Self::Atan,
            6 => Self::Exp,
            7 => Self::Ln,
            8 => Self::Log10,
            9 => Self::Cosh,
            10 => Self::Sinh,
            11 => Self::Tanh,
            12 => Self::Sqrt,
            13 => Self::Abs,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cos => "cos",
            Self::Sin => "sin",
            Self::Tan => "tan",
            Self::Acos => "acos",
            Self::Asin => "asin",
            Self::Atan => "atan",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log10 => "log10",
            Self::Cosh => "cosh",
            Self::Sinh => "sinh",
            Self::Tanh => "tanh",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
        }
    }

    pub fn eval(self, x: f64) -> f64 {
        match self {
            Self::Cos => x.cos(),
            Self::Sin => x.sin(),
            Self::Tan => x.tan(),
            Self::Acos => x.acos(),
            Self::Asin => x.asin(),
            Self::Atan => x.atan(),
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
            Self::Log10 => x.log10(),
            Self::Cosh => x.cosh(),
            Self::Sinh => x.sinh(),
            Self::Tanh => x.tanh(),
            Self::Sqrt => x.sqrt(),
            Self::Abs => x.abs(),
        }
    }
}

pub(crate) fn name_for_id(id: u32) -> Option<&'static str> {
    FunctionId::from_u32(id).map(FunctionId::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_id() {
        for raw in 0..COUNT {
            let f = FunctionId::from_u32(raw).expect("registered id");
            assert_eq!(f as u32, raw);
        }
        assert!(FunctionId::from_u32(COUNT).is_none());
    }

    #[test]
    fn names_are_lowercase_and_unique() {
        let mut names: Vec<&str> = (0..COUNT).map(|i| FunctionId::from_u32(i).unwrap().name()).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn eval_matches_std_math() {
        assert_eq!(FunctionId::Sin.eval(0.0), 0.0_f64.sin());
        assert_eq!(FunctionId::Sqrt.eval(4.0), 2.0);
        assert_eq!(FunctionId::Abs.eval(-3.0), 3.0);
    }
}
