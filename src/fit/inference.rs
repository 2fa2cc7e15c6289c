//! Sampling-distribution tails used for coefficient and overall-fit tests.
//!
//! Distributions come from `statrs`. The t quantile switches to the standard
//! normal once the residual df is large enough that the two agree to display
//! precision, since `StudentsT::inverse_cdf` loses accuracy there.

use statrs::distribution::{ContinuousCDF, FisherSnedecor, Normal, StudentsT};

/// Residual df from which the normal quantile replaces the t quantile.
const NORMAL_QUANTILE_DF: f64 = 1e5;

/// Two-sided p-value `P(|T_df| > |t|)`.
pub fn t_two_sided_p(t: f64, df: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.cdf(-t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Critical value `q` with `P(|T_df| <= q) = confidence`.
pub fn t_critical(confidence: f64, df: f64) -> f64 {
    let p = 0.5 + confidence / 2.0;
    if df >= NORMAL_QUANTILE_DF {
        return match Normal::new(0.0, 1.0) {
            Ok(dist) => dist.inverse_cdf(p),
            Err(_) => f64::NAN,
        };
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => dist.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Upper tail `P(F_{df1, df2} > f)`.
pub fn f_upper_tail(f: f64, df1: f64, df2: f64) -> f64 {
    if f.is_nan() {
        return f64::NAN;
    }
    if f <= 0.0 {
        return 1.0;
    }
    if f.is_infinite() {
        return 0.0;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_tail_reference_values() {
        // t = 2.0 with 10 df: two-sided p = 0.073388...
        assert!((t_two_sided_p(2.0, 10.0) - 0.073_388_034_770_8).abs() < 1e-9);
        // df = 1 is Cauchy: P(|T| > 1) = 0.5
        assert!((t_two_sided_p(1.0, 1.0) - 0.5).abs() < 1e-12);
        assert!((t_two_sided_p(0.0, 5.0) - 1.0).abs() < 1e-12);
        assert_eq!(t_two_sided_p(-2.0, 10.0), t_two_sided_p(2.0, 10.0));
    }

    #[test]
    fn critical_values_match_tables() {
        assert!((t_critical(0.95, 10.0) - 2.228_138_851_986).abs() < 1e-6);
        assert!((t_critical(0.95, 120.0) - 1.979_930_405).abs() < 1e-6);
    }

    #[test]
    fn critical_value_at_large_df_is_normal() {
        assert!((t_critical(0.95, 1e6) - 1.959_966).abs() < 1e-5);
        assert!((t_critical(0.95, 2e5) - 1.959_976).abs() < 2e-5);
    }

    #[test]
    fn f_tail_closed_form_for_two_numerator_df() {
        // With df1 = 2: P(F > f) = (1 + 2f/df2)^(-df2/2)
        let expected = (1.0_f64 + 2.0 * 3.0 / 10.0).powf(-5.0);
        assert!((f_upper_tail(3.0, 2.0, 10.0) - expected).abs() < 1e-7);
        assert_eq!(f_upper_tail(0.0, 3.0, 10.0), 1.0);
        assert!(f_upper_tail(f64::NAN, 3.0, 10.0).is_nan());
    }

    #[test]
    fn invalid_df_yields_nan() {
        assert!(t_two_sided_p(1.0, 0.0).is_nan());
        assert!(t_critical(0.95, -1.0).is_nan());
    }
}
