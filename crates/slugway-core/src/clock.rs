use jiff::Timestamp;

pub trait Clock: Send + Sync + 'static {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: Timestamp,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self { now }
    }

    /// A clock frozen at `seconds` past the Unix epoch.
    ///
    /// Panics when `seconds` is outside the range jiff supports.
    pub fn at_second(seconds: i64) -> Self {
        let now = Timestamp::from_second(seconds)
            .unwrap_or_else(|e| panic!("fixed clock second {seconds} out of range: {e}"));
        Self::new(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}
