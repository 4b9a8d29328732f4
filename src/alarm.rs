use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// weekday tag for alarm recurrence
/// serialized as the three letter form the alarm file uses ("Mon".."Sun")
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum,
)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    pub const ALL: [Self; 7] = [
        Self::Mon,
        Self::Tue,
        Self::Wed,
        Self::Thu,
        Self::Fri,
        Self::Sat,
        Self::Sun,
    ];

    #[must_use]
    pub const fn weekday(self) -> Weekday {
        match self {
            Self::Mon => Weekday::Mon,
            Self::Tue => Weekday::Tue,
            Self::Wed => Weekday::Wed,
            Self::Thu => Weekday::Thu,
            Self::Fri => Weekday::Fri,
            Self::Sat => Weekday::Sat,
            Self::Sun => Weekday::Sun,
        }
    }

    #[must_use]
    pub const fn from_weekday(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
            Weekday::Sun => Self::Sun,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidAlarm {
    #[error("hour {0} is out of range (0-23)")]
    Hour(u32),
    #[error("minute {0} is out of range (0-59)")]
    Minute(u32),
}

/// a single alarm
/// `days` is kept sorted with each tag at most once; empty means a
/// one-time alarm that fires at the next matching wall-clock time
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Alarm {
    /// assigned by the store, stable for the alarm's lifetime
    #[serde(default)]
    pub id: u64,
    pub hour: u32,
    pub minute: u32,
    pub label: String,
    #[serde(default)]
    pub days: Vec<Day>,
    #[serde(default = "default_ringtone")]
    pub ringtone: String,
    #[serde(default = "always_true")]
    pub enabled: bool,
    /// informational only
    pub created: NaiveDateTime,
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

/// sentinel resolved by the host to the built-in tone
#[must_use]
pub fn default_ringtone() -> String {
    "Default".to_string()
}

impl Alarm {
    pub fn new(
        hour: u32,
        minute: u32,
        label: String,
        mut days: Vec<Day>,
        ringtone: String,
        created: NaiveDateTime,
    ) -> Result<Self, InvalidAlarm> {
        days.sort_unstable();
        days.dedup();
        let alarm = Self {
            id: 0,
            hour,
            minute,
            label,
            days,
            ringtone,
            enabled: true,
            created,
        };
        alarm.validate()?;
        Ok(alarm)
    }

    /// checks the wall-clock field invariant; everything downstream
    /// relies on it, so alarms loaded from disk go through this too
    pub fn validate(&self) -> Result<(), InvalidAlarm> {
        if self.hour > 23 {
            return Err(InvalidAlarm::Hour(self.hour));
        }
        if self.minute > 59 {
            return Err(InvalidAlarm::Minute(self.minute));
        }
        Ok(())
    }

    #[must_use]
    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap()
    }

    #[must_use]
    pub fn is_recurring(&self) -> bool {
        !self.days.is_empty()
    }

    /// whether the alarm is scheduled on `day`; a one-time alarm
    /// matches every day
    #[must_use]
    pub fn matches_day(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&Day::from_weekday(day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn rejects_out_of_range_times() {
        let bad_hour = Alarm::new(24, 0, String::new(), vec![], default_ringtone(), created());
        assert_eq!(bad_hour.unwrap_err(), InvalidAlarm::Hour(24));
        let bad_minute = Alarm::new(8, 60, String::new(), vec![], default_ringtone(), created());
        assert_eq!(bad_minute.unwrap_err(), InvalidAlarm::Minute(60));
    }

    #[test]
    fn validate_rejects_out_of_range_edits() {
        let mut alarm =
            Alarm::new(8, 0, String::new(), vec![], default_ringtone(), created()).unwrap();
        assert!(alarm.validate().is_ok());
        alarm.hour = 24;
        assert_eq!(alarm.validate().unwrap_err(), InvalidAlarm::Hour(24));
    }

    #[test]
    fn days_are_deduplicated_and_sorted() {
        let alarm = Alarm::new(
            8,
            0,
            "work".to_string(),
            vec![Day::Fri, Day::Mon, Day::Fri],
            default_ringtone(),
            created(),
        )
        .unwrap();
        assert_eq!(alarm.days, vec![Day::Mon, Day::Fri]);
    }

    #[test]
    fn one_time_alarm_matches_every_day() {
        let alarm = Alarm::new(8, 0, String::new(), vec![], default_ringtone(), created()).unwrap();
        assert!(!alarm.is_recurring());
        assert!(Day::ALL.iter().all(|d| alarm.matches_day(d.weekday())));
    }

    #[test]
    fn recurring_alarm_matches_only_its_days() {
        let alarm = Alarm::new(
            8,
            0,
            String::new(),
            vec![Day::Mon, Day::Wed],
            default_ringtone(),
            created(),
        )
        .unwrap();
        assert!(alarm.matches_day(Weekday::Mon));
        assert!(alarm.matches_day(Weekday::Wed));
        assert!(!alarm.matches_day(Weekday::Tue));
        assert!(!alarm.matches_day(Weekday::Sun));
    }
}
