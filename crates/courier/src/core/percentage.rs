/// Percentage of `value` in `total`, from 0 to 100.
///
/// A zero `total` yields 0 instead of dividing by zero.
///
/// # Examples
///
/// ```
/// use courier::core::calculate_percentage;
///
/// assert_eq!(calculate_percentage(50, 200), 25.0);
/// assert_eq!(calculate_percentage(10, 0), 0.0);
/// ```
pub fn calculate_percentage(value: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    (value as f64 / total as f64) * 100.0
}
