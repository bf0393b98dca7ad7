//! Wall-clock gate for incremental harvesting.
//!
//! A harvest given a `between` window only pulls records while the local
//! time of day is inside it, and sleeps until the window opens otherwise.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio_util::sync::CancellationToken;

use crate::config::PAUSE_POLL_MS;
use crate::record::TimeWindow;

/// Source of local time and of blocking sleeps.
pub trait Clock {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Block for `duration`, returning early once `cancel` is triggered.
    fn sleep(&self, duration: TimeDelta, cancel: &CancellationToken);
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: TimeDelta, cancel: &CancellationToken) {
        let Ok(duration) = duration.to_std() else {
            return;
        };
        let deadline = Instant::now() + duration;
        let poll = Duration::from_millis(PAUSE_POLL_MS);

        while !cancel.is_cancelled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(poll));
        }
    }
}

/// How long to wait at `now` before harvesting may continue.
///
/// The window's times are anchored to `now`'s date:
///
/// - before `start`, with `stop` between `now` and `start`: inside a window
///   that wrapped past midnight, so no pause;
/// - before `start` otherwise: wait until `start` today;
/// - `start < stop <= now`: today's window has closed, wait until `start`
///   tomorrow;
/// - anything else is inside the window.
///
/// # Examples
/// ```
/// use chrono::{NaiveDate, NaiveTime, TimeDelta};
/// use oaiharvest_harvester::record::TimeWindow;
/// use oaiharvest_harvester::schedule::pause_duration;
///
/// let window = TimeWindow::new(
///     NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
///     NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
/// );
/// let now = NaiveDate::from_ymd_opt(2024, 5, 1)
///     .unwrap()
///     .and_hms_opt(20, 0, 0)
///     .unwrap();
/// assert_eq!(pause_duration(&window, now), Some(TimeDelta::hours(13)));
/// ```
pub fn pause_duration(window: &TimeWindow, now: NaiveDateTime) -> Option<TimeDelta> {
    let start = now.date().and_time(window.start);
    let stop = now.date().and_time(window.stop);

    if now < start {
        if now < stop && stop < start {
            return None;
        }
        return Some(start - now);
    }
    if start < stop && stop <= now {
        return Some(start + TimeDelta::days(1) - now);
    }
    None
}

/// Block until `window` allows harvesting or `cancel` is triggered. Returns
/// whether a pause happened.
pub fn maybe_pause(
    window: Option<&TimeWindow>,
    clock: &impl Clock,
    cancel: &CancellationToken,
) -> bool {
    let Some(window) = window else {
        return false;
    };

    let now = clock.now();
    match pause_duration(window, now) {
        Some(duration) => {
            tracing::info!(
                until = %(now + duration),
                seconds = duration.num_seconds(),
                "Pausing until harvest window opens"
            );
            clock.sleep(duration, cancel);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::cell::RefCell;

    fn window(start: (u32, u32), stop: (u32, u32)) -> TimeWindow {
        TimeWindow::new(
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(stop.0, stop.1, 0).unwrap(),
        )
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_inside_overnight_window_after_midnight() {
        assert_eq!(pause_duration(&window((23, 0), (1, 0)), at(0, 15)), None);
    }

    #[test]
    fn test_inside_overnight_window_before_midnight() {
        assert_eq!(pause_duration(&window((23, 0), (1, 0)), at(23, 30)), None);
    }

    #[test]
    fn test_before_overnight_window_opens() {
        assert_eq!(
            pause_duration(&window((23, 0), (1, 0)), at(12, 0)),
            Some(TimeDelta::hours(11))
        );
    }

    #[test]
    fn test_before_day_window_opens() {
        assert_eq!(
            pause_duration(&window((9, 0), (17, 0)), at(7, 30)),
            Some(TimeDelta::minutes(90))
        );
    }

    #[test]
    fn test_after_day_window_closed() {
        assert_eq!(
            pause_duration(&window((9, 0), (17, 0)), at(20, 0)),
            Some(TimeDelta::hours(13))
        );
        // Closing time itself is outside the window
        assert_eq!(
            pause_duration(&window((9, 0), (17, 0)), at(17, 0)),
            Some(TimeDelta::hours(16))
        );
    }

    #[test]
    fn test_inside_day_window() {
        assert_eq!(pause_duration(&window((9, 0), (17, 0)), at(9, 0)), None);
        assert_eq!(pause_duration(&window((9, 0), (17, 0)), at(12, 0)), None);
    }

    struct FakeClock {
        now: NaiveDateTime,
        slept: RefCell<Vec<TimeDelta>>,
    }

    impl Clock for FakeClock {
        fn now(&self) -> NaiveDateTime {
            self.now
        }

        fn sleep(&self, duration: TimeDelta, _cancel: &CancellationToken) {
            self.slept.borrow_mut().push(duration);
        }
    }

    #[test]
    fn test_maybe_pause_sleeps_for_computed_duration() {
        let clock = FakeClock {
            now: at(20, 0),
            slept: RefCell::new(Vec::new()),
        };
        assert!(maybe_pause(
            Some(&window((9, 0), (17, 0))),
            &clock,
            &CancellationToken::new()
        ));
        assert_eq!(*clock.slept.borrow(), vec![TimeDelta::hours(13)]);
    }

    #[test]
    fn test_maybe_pause_without_window_is_noop() {
        let clock = FakeClock {
            now: at(20, 0),
            slept: RefCell::new(Vec::new()),
        };
        let cancel = CancellationToken::new();
        assert!(!maybe_pause(None, &clock, &cancel));
        assert!(!maybe_pause(Some(&window((9, 0), (21, 0))), &clock, &cancel));
        assert!(clock.slept.borrow().is_empty());
    }

    #[test]
    fn test_system_clock_sleep_wakes_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let started = Instant::now();
        SystemClock.sleep(TimeDelta::hours(22), &cancel);

        assert!(started.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn test_system_clock_sleep_runs_to_deadline() {
        let started = Instant::now();
        SystemClock.sleep(TimeDelta::milliseconds(50), &CancellationToken::new());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
