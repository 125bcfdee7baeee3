//! Trigger Module
//!
//! Recurring wall-clock trigger built on cron expressions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A recurring trigger parsed from a cron expression
///
/// Accepts the classic five-field form (`minute hour day month weekday`) as
/// well as the six/seven-field form with a leading seconds field.
#[derive(Clone)]
pub struct ScheduleTrigger {
    expression: String,
    schedule: Schedule,
}

impl ScheduleTrigger {
    /// Parse a cron expression
    pub fn parse(expression: &str) -> Result<Self, cron::error::Error> {
        let expression = expression.trim();
        let schedule = match expression.split_whitespace().count() {
            5 => Schedule::from_str(&format!("0 {}", expression))?,
            _ => Schedule::from_str(expression)?,
        };

        Ok(Self { expression: expression.to_string(), schedule })
    }

    /// The expression as configured
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next fire instant strictly after `instant`
    pub fn next_after(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&instant).next()
    }
}

impl fmt::Debug for ScheduleTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScheduleTrigger").field(&self.expression).finish()
    }
}

impl fmt::Display for ScheduleTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Timelike};

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn hourly_fires_on_next_boundary() {
        let trigger = ScheduleTrigger::parse("0 * * * *").unwrap();

        assert_eq!(trigger.next_after(at(10, 15, 0)), Some(at(11, 0, 0)));
        assert_eq!(trigger.next_after(at(10, 59, 59)), Some(at(11, 0, 0)));
        // An instant on the boundary itself is not returned again
        assert_eq!(trigger.next_after(at(11, 0, 0)), Some(at(12, 0, 0)));
    }

    #[test]
    fn hourly_fires_once_per_boundary_over_simulated_day() {
        let trigger = ScheduleTrigger::parse("0 * * * *").unwrap();
        let start = at(0, 30, 0);
        let end = start + Duration::hours(24);

        let mut fires = Vec::new();
        let mut now = start;
        while let Some(next) = trigger.next_after(now) {
            if next > end {
                break;
            }
            fires.push(next);
            now = next;
        }

        assert_eq!(fires.len(), 24);
        for (i, fire) in fires.iter().enumerate() {
            assert_eq!(fire.minute(), 0);
            assert_eq!(fire.second(), 0);
            if i > 0 {
                assert_eq!(*fire - fires[i - 1], Duration::hours(1));
            }
        }
    }

    #[test]
    fn accepts_seconds_field() {
        let trigger = ScheduleTrigger::parse("*/30 * * * * *").unwrap();
        assert_eq!(trigger.next_after(at(8, 0, 10)), Some(at(8, 0, 30)));
        assert_eq!(trigger.to_string(), "*/30 * * * * *");
    }

    #[test]
    fn rejects_garbage() {
        assert!(ScheduleTrigger::parse("hourly please").is_err());
        assert!(ScheduleTrigger::parse("").is_err());
    }
}
