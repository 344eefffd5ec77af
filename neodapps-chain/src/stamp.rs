use std::{fs, io, path::Path, time::SystemTime};

/// Last observed modification time of a cached file.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FileStamp(Option<SystemTime>);

impl FileStamp {
    pub(crate) fn observe(path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    /// Stale when nothing was recorded yet or `current` is strictly newer.
    pub(crate) fn is_stale(&self, current: SystemTime) -> bool {
        match self.0 {
            None => true,
            Some(last) => current > last,
        }
    }

    pub(crate) fn record(&mut self, modified: SystemTime) {
        self.0 = Some(modified);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fresh_stamp_is_stale() {
        let stamp = FileStamp::default();
        assert!(stamp.is_stale(SystemTime::UNIX_EPOCH));
    }

    #[test]
    fn only_strictly_newer_times_are_stale() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut stamp = FileStamp::default();
        stamp.record(t0);

        assert!(!stamp.is_stale(t0));
        assert!(!stamp.is_stale(t0 - Duration::from_secs(1)));
        assert!(stamp.is_stale(t0 + Duration::from_millis(1)));
    }
}
