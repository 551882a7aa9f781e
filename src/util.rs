#[cfg(test)]
pub mod test_util {
    use float_cmp::{approx_eq, assert_approx_eq};

    /// Compares an action distribution entry by entry and checks that it is
    /// normalized.
    pub fn assert_distribution_eq(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "number of actions");

        for (action_idx, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(
                approx_eq!(f64, *a, *e, epsilon = 1e-12),
                "probability of action {}: {} != {}",
                action_idx,
                a,
                e
            );
        }

        assert_approx_eq!(f64, actual.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }
}
