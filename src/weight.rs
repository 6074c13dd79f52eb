//! Numeric abstraction over edge weights.
//!
//! The matching algorithm only needs ring arithmetic, comparisons and a
//! handful of range queries, so it runs unchanged on integer and floating
//! point weights. With integer weights every dual variable stays integral
//! (duals are kept pre-multiplied by 2), which makes the final optimality
//! check exact.

use std::fmt::{Debug, Display};

use num_traits::{FromPrimitive, Num, NumAssign};

/// Edge weight type accepted by the matching algorithm.
pub trait Weight:
    Copy + PartialOrd + Debug + Display + Num + NumAssign + FromPrimitive + 'static
{
    /// Priority that compares greater than any finite slack.
    fn infinity() -> Self;

    /// Largest edge weight for which dual-variable arithmetic stays in range.
    fn limit() -> Self;

    fn is_finite(self) -> bool;

    /// True if this weight lets the algorithm run in exact arithmetic.
    fn is_integral(self) -> bool;

    #[inline]
    fn two() -> Self {
        Self::one() + Self::one()
    }
}

macro_rules! integer_weight {
    ($($t:ty),*) => {
        $(
            impl Weight for $t {
                #[inline]
                fn infinity() -> Self {
                    <$t>::MAX
                }

                // Vertex duals, pseudo-slacks and lazy offsets are sums of a
                // few multiples of the maximum weight.
                #[inline]
                fn limit() -> Self {
                    <$t>::MAX / 8
                }

                #[inline]
                fn is_finite(self) -> bool {
                    true
                }

                #[inline]
                fn is_integral(self) -> bool {
                    true
                }
            }
        )*
    };
}

integer_weight!(i32, i64);

/// Floats with magnitude up to this bound are still exact after the few
/// additions the algorithm performs on them.
const EXACT_FLOAT_BOUND: f64 = (1u64 << 50) as f64;

impl Weight for f64 {
    #[inline]
    fn infinity() -> Self {
        f64::INFINITY
    }

    #[inline]
    fn limit() -> Self {
        f64::MAX / 4.0
    }

    #[inline]
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }

    #[inline]
    fn is_integral(self) -> bool {
        self.fract() == 0.0 && self.abs() <= EXACT_FLOAT_BOUND
    }
}
