pub mod align;
pub mod dashboard;
pub mod market;
pub mod realized;

pub use align::nearest_preceding;
pub use dashboard::summarize_dashboard;
pub use market::analyze_history;
pub use realized::realized_apy;

/// Arithmetic mean, or `None` for an empty input. Never yields 0 for "no data".
pub(crate) fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0_f64, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::mean;

    #[test]
    fn mean_of_nothing_is_absent() {
        assert_eq!(mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(vec![1.0, 2.0, 3.0]), Some(2.0));
    }
}
