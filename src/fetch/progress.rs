//! Download progress events.

/// Cumulative progress after one body chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Bytes received so far.
    pub bytes_so_far: u64,
    /// Expected body size from `Content-Length`, when the server sent one.
    pub total_bytes: Option<u64>,
    /// `bytes_so_far / total_bytes`, clamped to `[0, 1]`. `None` when the
    /// total is unknown or zero.
    pub ratio: Option<f64>,
}

impl ProgressEvent {
    /// Builds an event, deriving the ratio from the two counts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(bytes_so_far: u64, total_bytes: Option<u64>) -> Self {
        let ratio = total_bytes
            .filter(|total| *total > 0)
            .map(|total| (bytes_so_far as f64 / total as f64).min(1.0));
        Self {
            bytes_so_far,
            total_bytes,
            ratio,
        }
    }

    /// True when the known total has been reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_bytes
            .is_some_and(|total| self.bytes_so_far >= total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio_with_known_length() {
        let event = ProgressEvent::new(25, Some(100));
        assert_eq!(event.ratio, Some(0.25));
        assert!(!event.is_complete());
    }

    #[test]
    fn test_progress_ratio_unknown_length_is_none() {
        let event = ProgressEvent::new(4096, None);
        assert_eq!(event.ratio, None);
        assert!(!event.is_complete());
    }

    #[test]
    fn test_progress_ratio_zero_length_does_not_divide() {
        let event = ProgressEvent::new(10, Some(0));
        assert_eq!(event.ratio, None);
    }

    #[test]
    fn test_progress_ratio_clamped_when_server_under_reports() {
        let event = ProgressEvent::new(150, Some(100));
        assert_eq!(event.ratio, Some(1.0));
        assert!(event.is_complete());
    }
}
