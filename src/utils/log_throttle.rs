use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    suppressed: u64,
}

static WINDOWS: OnceLock<Mutex<HashMap<&'static str, Window>>> = OnceLock::new();

/// Rate-limits a log site identified by `key` to one event per `interval`.
///
/// Returns `Some(suppressed)` when the caller should log, carrying how many
/// events were swallowed since the last emitted one, and `None` otherwise.
pub fn should_emit(key: &'static str, interval: Duration) -> Option<u64> {
    let mut windows = WINDOWS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let now = Instant::now();

    let Some(window) = windows.get_mut(key) else {
        windows.insert(
            key,
            Window {
                opened_at: now,
                suppressed: 0,
            },
        );
        return Some(0);
    };

    if now.duration_since(window.opened_at) >= interval {
        let suppressed = window.suppressed;
        window.opened_at = now;
        window.suppressed = 0;
        Some(suppressed)
    } else {
        window.suppressed += 1;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::should_emit;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn emits_then_suppresses_then_reports_count() {
        let key = "test.log_throttle.emits_then_suppresses_then_reports_count";
        let interval = Duration::from_millis(50);

        assert_eq!(should_emit(key, interval), Some(0));
        assert_eq!(should_emit(key, interval), None);
        assert_eq!(should_emit(key, interval), None);
        assert_eq!(should_emit(key, interval), None);

        sleep(Duration::from_millis(70));
        assert_eq!(should_emit(key, interval), Some(3));
    }

    #[test]
    fn keys_are_independent() {
        let interval = Duration::from_secs(60);
        assert_eq!(should_emit("test.log_throttle.a", interval), Some(0));
        assert_eq!(should_emit("test.log_throttle.b", interval), Some(0));
        assert_eq!(should_emit("test.log_throttle.a", interval), None);
    }
}
