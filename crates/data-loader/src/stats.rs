//! Derived box-score metrics.

/// Weight of a free-throw attempt in the true-shooting denominator
const FTA_WEIGHT: f64 = 0.44;

/// True-shooting percentage: `PTS / (2 * (FGA + 0.44 * FTA))`
///
/// Returns `None` when the player has no shooting attempts (the
/// denominator is not positive), which the cohort treats as missing.
pub fn true_shooting_pct(pts: f64, fga: f64, fta: f64) -> Option<f64> {
    let attempts = fga + FTA_WEIGHT * fta;
    if attempts > 0.0 {
        Some(pts / (2.0 * attempts))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_shooting() {
        // 20 points on 15 FGA and 5 FTA
        let ts = true_shooting_pct(20.0, 15.0, 5.0).unwrap();
        assert!((ts - 20.0 / (2.0 * 17.2)).abs() < 1e-12);
    }

    #[test]
    fn test_true_shooting_without_attempts() {
        assert_eq!(true_shooting_pct(0.0, 0.0, 0.0), None);
    }
}
