//! Daily job scheduling with a polling ticker.
use crate::error::BotError;
use anyhow::Result;
use chrono::{Days, Local, NaiveDateTime, NaiveTime};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    /// Parse an `HH:MM` post time.
    pub fn parse(s: &str) -> Result<Self> {
        let at = NaiveTime::parse_from_str(s, "%H:%M")
            .map_err(|_| BotError::InvalidSchedule(s.to_string()))?;
        Ok(Self { at })
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// First occurrence strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            now.date()
                .checked_add_days(Days::new(1))
                .map(|d| d.and_time(self.at))
                .unwrap_or(NaiveDateTime::MAX)
        }
    }
}

pub struct Scheduler {
    schedule: DailySchedule,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(schedule: DailySchedule, poll_interval: Duration) -> Self {
        Self {
            schedule,
            poll_interval,
        }
    }

    /// Run `job` once per day until `cancel` fires. A failing job ends the loop with its error.
    pub async fn run<T, F, Fut>(
        self: &Self,
        clock: &impl Clock,
        cancel: CancellationToken,
        mut job: F,
    ) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut next = self.schedule.next_after(clock.now());
        info!("Next run scheduled at {}", next);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scheduler stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if clock.now() >= next {
                        job().await?;
                        next = self.schedule.next_after(clock.now());
                        info!("Next run scheduled at {}", next);
                    }
                }
            }
        }
    }
}
