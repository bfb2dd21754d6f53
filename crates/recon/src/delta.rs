use crate::config::ZeroBaseline;

/// Percentage rendered when the change cannot be computed.
pub const NO_CHANGE: &str = "0.00";

/// Label rendered under [`ZeroBaseline::New`].
pub const NEW_VALUE: &str = "new";

#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    /// `new - old`, `None` when either side is missing.
    pub difference: Option<f64>,
    /// Two-decimal signed percentage, e.g. `"-12.50"`.
    pub percentage: String,
}

/// Compare `new` against `old` with the default zero-baseline policy.
pub fn delta(new: Option<f64>, old: Option<f64>) -> Delta {
    delta_with(new, old, ZeroBaseline::default())
}

pub fn delta_with(new: Option<f64>, old: Option<f64>, baseline: ZeroBaseline) -> Delta {
    let difference = match (new, old) {
        (Some(n), Some(o)) => Some(n - o),
        _ => None,
    };

    let percentage = match (new, old) {
        (Some(n), Some(o)) => {
            let pct = (n - o) / o * 100.0;
            if pct.is_finite() {
                format_percentage(pct)
            } else {
                zero_baseline_label(baseline, n).to_string()
            }
        }
        (Some(n), None) => zero_baseline_label(baseline, n).to_string(),
        // A value that disappeared reads as a drop to zero.
        (None, Some(o)) if o.is_finite() && o != 0.0 => format_percentage(-100.0),
        _ => NO_CHANGE.to_string(),
    };

    Delta { difference, percentage }
}

/// Rendering for a change whose old value is zero, missing or otherwise
/// unusable as a divisor.
pub fn zero_baseline_label(baseline: ZeroBaseline, new: f64) -> &'static str {
    match baseline {
        ZeroBaseline::Zero => NO_CHANGE,
        ZeroBaseline::New if new != 0.0 && new.is_finite() => NEW_VALUE,
        ZeroBaseline::New => NO_CHANGE,
    }
}

/// Two decimals, no `+`, and no `-0.00`.
pub fn format_percentage(pct: f64) -> String {
    let s = format!("{pct:.2}");
    if s == "-0.00" {
        NO_CHANGE.to_string()
    } else {
        s
    }
}

/// `true` when a stored change string records actual movement.
pub fn is_change(percentage: Option<&str>) -> bool {
    match percentage {
        None => false,
        Some(p) => {
            let p = p.trim();
            !p.is_empty() && p != NO_CHANGE && p.parse::<f64>().map_or(true, |v| v != 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn basic_increase() {
        let d = delta(Some(12.0), Some(10.0));
        assert_eq!(d.difference, Some(2.0));
        assert_eq!(d.percentage, "20.00");
    }

    #[test]
    fn negative_keeps_sign() {
        let d = delta(Some(70.0), Some(80.0));
        assert_eq!(d.difference, Some(-10.0));
        assert_eq!(d.percentage, "-12.50");
    }

    #[test]
    fn unchanged_is_zero_without_sign() {
        assert_eq!(delta(Some(5.0), Some(5.0)).percentage, "0.00");
        assert_eq!(delta(Some(-5.0), Some(-5.0)).percentage, "0.00");
    }

    #[test]
    fn tiny_negative_does_not_render_minus_zero() {
        let d = delta(Some(99_999.999), Some(100_000.0));
        assert_eq!(d.percentage, "0.00");
    }

    #[test]
    fn zero_old_value() {
        assert_eq!(delta(Some(10.0), Some(0.0)).percentage, "0.00");
        assert_eq!(delta(Some(0.0), Some(0.0)).percentage, "0.00");
        assert_eq!(delta(Some(10.0), Some(0.0)).difference, Some(10.0));
    }

    #[test]
    fn missing_values() {
        let d = delta(Some(10.0), None);
        assert_eq!(d.percentage, "0.00");
        assert_eq!(d.difference, None);
        assert_eq!(delta(None, None).percentage, "0.00");
    }

    #[test]
    fn missing_new_value_is_a_full_drop() {
        let d = delta(None, Some(10.0));
        assert_eq!(d.percentage, "-100.00");
        assert_eq!(d.difference, None);
        assert_eq!(delta(None, Some(-4.0)).percentage, "-100.00");
        assert_eq!(delta(None, Some(0.0)).percentage, "0.00");
        assert_eq!(delta_with(None, Some(0.0), ZeroBaseline::New).percentage, "0.00");
    }

    #[test]
    fn new_label_policy() {
        assert_eq!(delta_with(Some(10.0), Some(0.0), ZeroBaseline::New).percentage, "new");
        assert_eq!(delta_with(Some(10.0), None, ZeroBaseline::New).percentage, "new");
        assert_eq!(delta_with(Some(0.0), Some(0.0), ZeroBaseline::New).percentage, "0.00");
        assert_eq!(delta_with(Some(11.0), Some(10.0), ZeroBaseline::New).percentage, "10.00");
    }

    #[test]
    fn change_detection() {
        assert!(is_change(Some("20.00")));
        assert!(is_change(Some("-0.50")));
        assert!(is_change(Some("new")));
        assert!(!is_change(Some("0.00")));
        assert!(!is_change(Some("")));
        assert!(!is_change(None));
    }

    proptest! {
        #[test]
        fn zero_old_is_always_zero_percent(new in -1.0e9f64..1.0e9) {
            prop_assert_eq!(delta(Some(new), Some(0.0)).percentage, "0.00");
        }

        #[test]
        fn percentage_matches_rounded_formula(
            old in prop::num::f64::NORMAL.prop_filter("bounded", |v| v.abs() > 1e-3 && v.abs() < 1e9),
            new in -1.0e9f64..1.0e9,
        ) {
            let expected = format_percentage((new - old) / old * 100.0);
            let got = delta(Some(new), Some(old)).percentage;
            prop_assert_eq!(&got, &expected);
            prop_assert!(!got.starts_with('+'));
            let parsed: f64 = got.parse().unwrap();
            let exact = (new - old) / old * 100.0;
            prop_assert!((parsed - exact).abs() <= 0.005 + exact.abs() * 1e-12);
        }

        #[test]
        fn identical_values_are_zero_percent(v in -1.0e9f64..1.0e9) {
            prop_assert_eq!(delta(Some(v), Some(v)).percentage, "0.00");
        }
    }
}
