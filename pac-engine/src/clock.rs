//! Time source for the date and time predicates
//!
//! Every time-sensitive helper reads the current instant through a [`Clock`]
//! so that a single override changes what all of them observe.

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use std::fmt;
use std::sync::RwLock;

/// Source of the current instant and the offset used for "local" evaluation
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// UTC offset used when a predicate is evaluated without "GMT"
    fn local_offset(&self) -> FixedOffset;

    /// Current instant projected into the local offset
    fn now_local(&self) -> DateTime<FixedOffset> {
        self.now().with_timezone(&self.local_offset())
    }

    /// Current instant projected into UTC
    fn now_gmt(&self) -> DateTime<FixedOffset> {
        self.now().with_timezone(&Utc.fix())
    }
}

/// Wall clock in the system default timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

/// A clock frozen at one instant with an explicit local offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    instant: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { instant, offset }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }

    fn local_offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Swappable clock owned by the composition root.
///
/// Resolves to [`SystemClock`] until [`ClockSource::set_clock`] installs a
/// fixed instant. The override is only meant for test setup; concurrent
/// production use never touches it.
#[derive(Debug, Default)]
pub struct ClockSource {
    fixed: RwLock<Option<FixedClock>>,
}

impl ClockSource {
    /// Clock backed by the system time
    pub fn system() -> Self {
        Self::default()
    }

    /// Freeze the clock at `instant`, using `offset` for local evaluation
    pub fn set_clock(&self, instant: DateTime<Utc>, offset: FixedOffset) {
        let mut fixed = self.fixed.write().unwrap_or_else(|e| e.into_inner());
        *fixed = Some(FixedClock::new(instant, offset));
    }

    /// Drop any override and go back to the system clock
    pub fn reset(&self) {
        let mut fixed = self.fixed.write().unwrap_or_else(|e| e.into_inner());
        *fixed = None;
    }

    fn current(&self) -> Option<FixedClock> {
        *self.fixed.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ClockSource {
    fn now(&self) -> DateTime<Utc> {
        match self.current() {
            Some(fixed) => fixed.now(),
            None => SystemClock.now(),
        }
    }

    fn local_offset(&self) -> FixedOffset {
        match self.current() {
            Some(fixed) => fixed.local_offset(),
            None => SystemClock.local_offset(),
        }
    }

    // Read the override once so instant and offset come from the same clock
    fn now_local(&self) -> DateTime<FixedOffset> {
        match self.current() {
            Some(fixed) => fixed.now_local(),
            None => SystemClock.now_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn at(instant: &str) -> DateTime<Utc> {
        instant.parse().unwrap()
    }

    #[test]
    fn test_fixed_clock_projections() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let clock = FixedClock::new(at("2022-05-23T22:30:00Z"), offset);

        let local = clock.now_local();
        assert_eq!(local.day(), 24);
        assert_eq!(local.hour(), 0);

        let gmt = clock.now_gmt();
        assert_eq!(gmt.day(), 23);
        assert_eq!(gmt.hour(), 22);
    }

    #[test]
    fn test_clock_source_override_and_reset() {
        let source = ClockSource::system();
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();

        source.set_clock(at("2001-02-03T04:05:06Z"), offset);
        assert_eq!(source.now(), at("2001-02-03T04:05:06Z"));
        assert_eq!(source.local_offset(), offset);
        assert_eq!(source.now_local().day(), 2);

        source.reset();
        assert!(source.now().year() > 2001);
    }
}
