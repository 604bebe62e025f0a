// src/job/schedule.rs
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// A fixed wall-clock time of day in a named time zone (e.g. 08:00 Asia/Jakarta).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    zone: Tz,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, zone: Tz) -> Self {
        Self { at, zone }
    }

    /// `time` as `HH:MM`, `zone` as an IANA name (`Asia/Jakarta`, `UTC`).
    pub fn parse(time: &str, zone: &str) -> Result<Self> {
        let at = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .with_context(|| format!("invalid schedule time {time:?}, expected HH:MM"))?;
        let zone = zone
            .trim()
            .parse::<Tz>()
            .map_err(|e| anyhow!("unknown time zone {zone:?}: {e}"))?;
        Ok(Self::new(at, zone))
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Next occurrence strictly after `now`. Rolls to tomorrow once today's slot has passed.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_day = now.with_timezone(&self.zone).date_naive();
        (0..3)
            .map(|n| self.slot_on(local_day + Duration::days(n)))
            .find(|slot| *slot > now)
            .unwrap_or_else(|| self.slot_on(local_day + Duration::days(3)))
    }

    /// The instant `at` falls on `day`. A repeated wall time takes its first occurrence;
    /// a skipped one runs at the same distance past the transition.
    fn slot_on(&self, day: NaiveDate) -> DateTime<Utc> {
        let local = day.and_time(self.at);
        match self.zone.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(first, _) => first.with_timezone(&Utc),
            LocalResult::None => {
                let before = self
                    .zone
                    .offset_from_utc_datetime(&(local - Duration::days(1)))
                    .fix();
                Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(before.local_minus_utc()))))
            }
        }
    }

    /// Human-readable form for logs, e.g. `08:00 Asia/Jakarta daily`.
    pub fn describe(&self) -> String {
        format!("{} {} daily", self.at.format("%H:%M"), self.zone)
    }
}
