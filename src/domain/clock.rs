use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::RwLock;

/// Source of "now" for every component that timestamps or dates anything.
///
/// Passed explicitly so tests and batch replays can pin the time.
pub trait Clock: Send + Sync {
    /// The current instant, in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Today's calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct SettableClock {
    current: RwLock<DateTime<Utc>>,
}

impl SettableClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(time),
        }
    }

    /// Start at midnight UTC of the given date.
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.write() = time;
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.write();
        *current += by;
    }
}

impl Default for SettableClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for SettableClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read()
    }
}
