use chrono::TimeDelta;

quantity!(Hours, via: f64, suffix: "h", precision: 2);

impl From<TimeDelta> for Hours {
    fn from(time_delta: TimeDelta) -> Self {
        Self(time_delta.as_seconds_f64() / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn from_time_delta() {
        assert_abs_diff_eq!(Hours::from(TimeDelta::minutes(15)).0, 0.25);
        assert_abs_diff_eq!(Hours::from(TimeDelta::hours(24)).0, 24.0);
    }
}
