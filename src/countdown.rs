//! Decorative header clock counting down to a fixed moment.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

pub const CELEBRATION: &str = "🎉 Happy New Year 🎉";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Running {
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
    },
    Elapsed,
}

impl CountdownState {
    pub fn label(&self) -> String {
        match self {
            CountdownState::Running {
                days,
                hours,
                minutes,
                seconds,
            } => format!("{:02}d {:02}h {:02}m {:02}s", days, hours, minutes, seconds),
            CountdownState::Elapsed => CELEBRATION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    target: DateTime<Local>,
}

impl Countdown {
    pub fn new(target: DateTime<Local>) -> Self {
        Self { target }
    }

    /// Interprets `target` as local wall-clock time. `None` if that time does
    /// not exist locally (DST gap).
    pub fn from_local(target: NaiveDateTime) -> Option<Self> {
        Local.from_local_datetime(&target).earliest().map(Self::new)
    }

    pub fn state(&self) -> CountdownState {
        self.state_at(Local::now())
    }

    pub fn state_at(&self, now: DateTime<Local>) -> CountdownState {
        let remaining_ms = (self.target - now).num_milliseconds();
        if remaining_ms < 0 {
            return CountdownState::Elapsed;
        }

        let total_seconds = remaining_ms / 1000;
        CountdownState::Running {
            days: total_seconds / 86_400,
            hours: (total_seconds % 86_400) / 3_600,
            minutes: (total_seconds % 3_600) / 60,
            seconds: total_seconds % 60,
        }
    }
}
