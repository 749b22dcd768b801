//! Fire-and-forget progress reporting for long project updates.

/// Receives coarse progress for one project key (`progress:<project>`).
///
/// Implementations must not fail the caller; reporting is best effort.
pub trait ProgressSink {
    /// Announces the expected amount of work and resets progress to zero.
    fn start(&self, key: &str, work: u64);
    fn increment(&self, key: &str);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn start(&self, _key: &str, _work: u64) {}

    fn increment(&self, _key: &str) {}
}

/// Expected work for a project with `stored_ratings` rows.
///
/// Most articles carry both kinds, some only one, hence slightly under two
/// units per stored row.
pub fn initial_work(stored_ratings: usize) -> u64 {
    stored_ratings as u64 * 19 / 10
}

#[cfg(test)]
mod tests {
    use super::initial_work;

    #[test]
    fn initial_work_truncates_like_integer_scaling() {
        assert_eq!(initial_work(0), 0);
        assert_eq!(initial_work(1), 1);
        assert_eq!(initial_work(10), 19);
        assert_eq!(initial_work(1000), 1900);
    }
}
