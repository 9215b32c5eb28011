use chrono::{Local, NaiveDateTime};

/// Source of "now" for every time-dependent rule.
///
/// Appointment times are wall-clock values without a zone, so the clock
/// hands out local naive timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
