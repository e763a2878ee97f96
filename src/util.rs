/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```
/// use gridlearn::assert_interval;
///
/// let alpha = 0.2;
/// assert_interval!(alpha, 0.0, 1.0);
/// ```
/// An `alpha` of `2.0` would panic with the message "Invalid value for \`alpha\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Round to two decimal places, the precision scores are reported with
pub(crate) fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
