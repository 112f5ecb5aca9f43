use chrono::{DateTime, Days, Utc};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant; used for reproducible reports and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Start of the trailing window ending at `now`, `days` calendar days back.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn describe_window(days: u32) -> String {
    match days {
        1 => "Last 1 Day".to_string(),
        n => format!("Last {n} Days"),
    }
}
