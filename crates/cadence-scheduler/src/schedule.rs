use std::time::Duration;

use cadence_core::Task;

/// Extra time the expiry waiter sleeps past `end_unix`, so the last
/// in-window firing is never cut off.
pub const DISCARD_BUFFER: Duration = Duration::from_secs(1);

/// Where a task lands when it is handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `now == start_unix`: run immediately.
    Now,
    /// `now < start_unix`: wait this long, then run.
    Delayed(Duration),
    /// `now > start_unix`: the process restarted (or the task was re-enabled)
    /// after the start instant passed.
    Resume,
}

/// Classify `task` against the current unix time.
pub fn placement(now_unix: i64, task: &Task) -> Placement {
    match now_unix.cmp(&task.start_unix) {
        std::cmp::Ordering::Equal => Placement::Now,
        std::cmp::Ordering::Less => {
            Placement::Delayed(Duration::from_secs((task.start_unix - now_unix) as u64))
        }
        std::cmp::Ordering::Greater => Placement::Resume,
    }
}

/// Phase-aligned delay until the next firing of a recurring task that
/// started `now - start` seconds ago.
///
/// Returns `None` when that firing would land after `end_unix`: the validity
/// window has closed and the task is dropped. The result is in `(0, recur]`:
/// a resume exactly on a period boundary waits one full period, because the
/// boundary firing itself is treated as missed.
pub fn resume_delay(now_unix: i64, start_unix: i64, end_unix: i64, recur_secs: u64) -> Option<Duration> {
    if recur_secs == 0 {
        return None;
    }
    let recur = recur_secs as i64;
    let elapsed = (now_unix - start_unix).max(0);
    let next_in = recur - elapsed % recur;
    if now_unix + next_in > end_unix {
        return None;
    }
    Some(Duration::from_secs(next_in as u64))
}

/// How long the expiry waiter of a freshly registered recurring task sleeps.
pub fn discard_delay(now_unix: i64, end_unix: i64) -> Duration {
    Duration::from_secs((end_unix - now_unix).max(0) as u64) + DISCARD_BUFFER
}
