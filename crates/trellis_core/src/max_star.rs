//! Log-sum-exp primitive and the combine strategies built on it.
//!
//! The BCJR recursions need one reduction: combining log-domain values that
//! represent probabilities being summed. The exact form is
//! `max*(a, b) = ln(e^a + e^b)`, evaluated as `max(a, b) + ln(1 + e^-|a-b|)`
//! so that nothing overflows. The max-log approximation drops the
//! correction term. Both are expressed through [`Combine`] so the decoder
//! recursion is written once.

/// Numerically stable `ln(e^a + e^b)`.
///
/// Operands equal to `-inf` (impossible events) are short-circuited so the
/// result never becomes NaN: `max_star2(-inf, x) == x` for every `x`,
/// including `-inf`.
#[inline]
pub fn max_star2(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    if a == f64::INFINITY || b == f64::INFINITY {
        return f64::INFINITY;
    }
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// Numerically stable `ln(sum(exp(v)))` over a slice.
///
/// Takes `m = max(values)` and returns `m + ln(sum(exp(v - m)))`. An empty
/// slice or a slice of `-inf` yields `-inf`; a `+inf` element yields `+inf`.
pub fn max_star(values: &[f64]) -> f64 {
    let m = max_of(values);
    if !m.is_finite() {
        return m;
    }
    let sum: f64 = values.iter().map(|&v| (v - m).exp()).sum();
    m + sum.ln()
}

/// Plain maximum of a slice, `-inf` when empty.
#[inline]
pub fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Log-domain "addition" used by the forward-backward recursion.
///
/// Implementations must be commutative and associative, and treat
/// [`Combine::IDENTITY`] (`-inf`) as the neutral element.
pub trait Combine {
    /// Neutral element: the log of probability zero.
    const IDENTITY: f64 = f64::NEG_INFINITY;

    /// Name shown in logs and reports.
    const NAME: &'static str;

    /// Combines two log-domain values.
    fn combine(a: f64, b: f64) -> f64;

    /// Combines a whole slice; the identity for an empty slice.
    fn combine_all(values: &[f64]) -> f64 {
        values.iter().fold(Self::IDENTITY, |acc, &v| Self::combine(acc, v))
    }
}

/// Exact log-MAP combine (`max*`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxStar;

impl Combine for MaxStar {
    const NAME: &'static str = "log-bcjr";

    #[inline(always)]
    fn combine(a: f64, b: f64) -> f64 {
        max_star2(a, b)
    }

    fn combine_all(values: &[f64]) -> f64 {
        max_star(values)
    }
}

/// Max-log approximation (`max`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxLog;

impl Combine for MaxLog {
    const NAME: &'static str = "max-log-bcjr";

    #[inline(always)]
    fn combine(a: f64, b: f64) -> f64 {
        a.max(b)
    }

    fn combine_all(values: &[f64]) -> f64 {
        max_of(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    const NEG_INF: f64 = f64::NEG_INFINITY;

    #[test]
    fn single_value_is_identity() {
        for v in [-3.5, 0.0, 1e-9, 42.0] {
            assert_eq!(max_star(&[v]), v);
            assert_eq!(MaxLog::combine_all(&[v]), v);
        }
    }

    #[test]
    fn negative_infinity_is_neutral() {
        assert_eq!(max_star(&[NEG_INF, 2.5]), 2.5);
        assert_eq!(max_star2(NEG_INF, 2.5), 2.5);
        assert_eq!(max_star2(2.5, NEG_INF), 2.5);
        assert_eq!(max_star(&[NEG_INF, NEG_INF]), NEG_INF);
        assert_eq!(max_star2(NEG_INF, NEG_INF), NEG_INF);
        assert_eq!(max_star(&[]), NEG_INF);
        assert!(!MaxStar::combine_all(&[NEG_INF; 4]).is_nan());
    }

    #[test]
    fn matches_naive_log_sum_exp() {
        let v = [0.1, -1.3, 2.0, 0.7];
        let naive = v.iter().map(|x: &f64| x.exp()).sum::<f64>().ln();
        assert!((max_star(&v) - naive).abs() < 1e-12);

        let pairwise = v.iter().fold(NEG_INF, |acc, &x| max_star2(acc, x));
        assert!((pairwise - naive).abs() < 1e-12);
    }

    #[test]
    fn does_not_overflow_on_large_values() {
        let r = max_star(&[1000.0, 1000.0]);
        assert!((r - (1000.0 + 2f64.ln())).abs() < 1e-9);
        assert_eq!(max_star2(-1e6, 0.0), 0.0);
    }

    #[test]
    fn permutation_invariant() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut v: Vec<f64> = (0..8).map(|_| rng.gen_range(-20.0..20.0)).collect();
        let reference = max_star(&v);
        for _ in 0..16 {
            v.shuffle(&mut rng);
            assert!((max_star(&v) - reference).abs() < 1e-12);
        }
    }

    #[test]
    fn max_log_lower_bounds_max_star() {
        let v = [0.0, 0.0];
        assert_eq!(MaxLog::combine_all(&v), 0.0);
        assert!((MaxStar::combine_all(&v) - 2f64.ln()).abs() < 1e-12);
    }
}
