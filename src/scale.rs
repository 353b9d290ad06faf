use chrono::DateTime;

use crate::data::format_number;
use crate::ir::Scale;

/// Continuous scale over `values`, padded 5% on both sides.
///
/// With `include_zero` the domain is stretched to cover 0 first, as bars
/// and histograms are drawn from the baseline.
pub fn continuous<I>(values: I, include_zero: bool) -> Scale
where
    I: IntoIterator<Item = f64>,
{
    let (mut min, mut max) = min_max(values);
    if include_zero {
        if min > 0.0 {
            min = 0.0;
        }
        if max < 0.0 {
            max = 0.0;
        }
    }
    let (lo, hi) = pad_range(min, max);
    // Keep the baseline on the frame when the data sits on one side of it
    let lo = if include_zero && min == 0.0 { 0.0 } else { lo };
    let hi = if include_zero && max == 0.0 && min < 0.0 { 0.0 } else { hi };
    Scale {
        domain: (lo, hi),
        is_categorical: false,
        is_temporal: false,
        categories: Vec::new(),
    }
}

/// Time scale over epoch seconds
pub fn temporal<I>(values: I) -> Scale
where
    I: IntoIterator<Item = f64>,
{
    let (min, max) = min_max(values);
    let (lo, hi) = if min == max {
        // one day either side
        (min - 86_400.0, max + 86_400.0)
    } else {
        pad_range(min, max)
    };
    Scale {
        domain: (lo, hi),
        is_categorical: false,
        is_temporal: true,
        categories: Vec::new(),
    }
}

/// Band scale: category `i` is centred on `i`.
pub fn categorical(categories: Vec<String>) -> Scale {
    let n = categories.len().max(1) as f64;
    Scale {
        domain: (-0.5, n - 0.5),
        is_categorical: true,
        is_temporal: false,
        categories,
    }
}

/// Fixed domain with no axis semantics, used by pie charts
pub fn fixed(min: f64, max: f64) -> Scale {
    Scale {
        domain: (min, max),
        is_categorical: false,
        is_temporal: false,
        categories: Vec::new(),
    }
}

fn min_max<I>(values: I) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
{
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    if min == f64::INFINITY {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

pub fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = max * 0.05 - min * 0.05;
        ((min - padding).max(f64::MIN), (max + padding).min(f64::MAX))
    }
}

/// Text for an axis tick at position `v`
pub fn tick_label(scale: &Scale, v: f64) -> String {
    if scale.is_categorical {
        let idx = v.round();
        if (v - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        return scale.categories.get(idx as usize).cloned().unwrap_or_default();
    }
    if scale.is_temporal {
        return match DateTime::from_timestamp(v.round() as i64, 0) {
            Some(dt) => dt.format("%Y-%m-%d").to_string(),
            None => String::new(),
        };
    }
    let span = (scale.domain.1 - scale.domain.0).abs();
    if span >= 1000.0 {
        format_thousands(v)
    } else if span >= 10.0 {
        format_number(v.round())
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Round to an integer and group digits in threes: 12852.4 -> "12,852"
pub fn format_thousands(v: f64) -> String {
    let rounded = v.round();
    if !rounded.is_finite() || rounded.abs() >= 1e15 {
        return format!("{:.3e}", v);
    }
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_continuous() {
        let s = continuous(vec![0.0, 10.0], false);
        assert!(s.domain.0 < 0.0);
        assert!(s.domain.1 > 10.0);
        assert!(!s.is_categorical);
    }

    #[test]
    fn test_scale_single_point() {
        let s = continuous(vec![5.0], false);
        assert_eq!(s.domain, (4.0, 6.0));
    }

    #[test]
    fn test_include_zero_keeps_baseline() {
        let s = continuous(vec![15.0, 20.0], true);
        assert_eq!(s.domain.0, 0.0);
        assert_eq!(s.domain.1, 21.0);
    }

    #[test]
    fn test_scale_categorical() {
        let s = categorical(vec!["A".to_string(), "B".to_string()]);
        assert!(s.is_categorical);
        assert_eq!(s.domain, (-0.5, 1.5));
        assert_eq!(tick_label(&s, 1.0), "B");
        assert_eq!(tick_label(&s, 0.5), "");
        assert_eq!(tick_label(&s, 2.0), "");
    }

    #[test]
    fn test_temporal_tick_label() {
        let s = temporal(vec![1_514_764_800.0, 1_517_443_200.0]);
        assert!(s.is_temporal);
        assert_eq!(tick_label(&s, 1_514_764_800.0), "2018-01-01");
    }

    #[test]
    fn test_pad_range_extreme_values_stay_finite() {
        let (lo, hi) = pad_range(-1e308, 1e308);
        assert!(lo.is_finite() && hi.is_finite());
        assert!(lo < -1e308 && hi > 1e308);
        let s = continuous(vec![f64::MAX, 0.0], true);
        assert!(s.domain.1.is_finite());
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(41746.0), "41,746");
        assert_eq!(format_thousands(999.6), "1,000");
        assert_eq!(format_thousands(-1234567.0), "-1,234,567");
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(1e308), "1.000e308");
    }
}
