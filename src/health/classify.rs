//! Status code to error/throttle/fault flags.

use axum::http::StatusCode;
use serde::Serialize;

/// Health flags attached to a segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthFlags {
    pub error: bool,
    pub throttle: bool,
    pub fault: bool,
}

impl HealthFlags {
    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match (self.error, self.throttle, self.fault) {
            (_, true, _) => "throttle",
            (true, _, _) => "error",
            (_, _, true) => "fault",
            _ => "ok",
        }
    }
}

/// Classify a status code. Total over all integers; anything outside the
/// 4xx/5xx ranges sets no flag.
pub fn classify(status: i64) -> HealthFlags {
    HealthFlags {
        error: (400..500).contains(&status),
        throttle: status == 429,
        fault: (500..600).contains(&status),
    }
}

impl From<StatusCode> for HealthFlags {
    fn from(status: StatusCode) -> Self {
        classify(i64::from(status.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_examples() {
        assert_eq!(classify(200), HealthFlags::default());
        assert_eq!(classify(404), HealthFlags { error: true, throttle: false, fault: false });
        assert_eq!(classify(429), HealthFlags { error: true, throttle: true, fault: false });
        assert_eq!(classify(503), HealthFlags { error: false, throttle: false, fault: true });
    }

    #[test]
    fn test_classify_boundaries_and_garbage() {
        for status in [0, -1, -429, 399, 600, 999, i64::MAX, i64::MIN] {
            assert_eq!(classify(status), HealthFlags::default(), "status {}", status);
        }
        assert!(classify(400).error);
        assert!(classify(499).error);
        assert!(classify(500).fault);
        assert!(classify(599).fault);
    }

    #[test]
    fn test_classify_matches_ranges() {
        for status in -100..1000 {
            let flags = classify(status);
            assert_eq!(flags.error, (400..500).contains(&status));
            assert_eq!(flags.throttle, status == 429);
            assert_eq!(flags.fault, (500..600).contains(&status));
            assert_eq!(flags.error && flags.throttle, status == 429);
        }
    }

    #[test]
    fn test_from_status_code() {
        assert!(HealthFlags::from(StatusCode::TOO_MANY_REQUESTS).throttle);
        assert!(HealthFlags::from(StatusCode::BAD_GATEWAY).fault);
        assert_eq!(HealthFlags::from(StatusCode::NOT_FOUND).outcome(), "error");
        assert_eq!(HealthFlags::from(StatusCode::OK).outcome(), "ok");
    }
}
