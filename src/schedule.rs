use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::{alarm::Alarm, store::AlarmStore};

/// snooze defers by a fixed five minutes
pub const SNOOZE_MINUTES: i64 = 5;

/// width of the due window; an alarm is due for the whole target
/// minute so a tick that lands late in the minute still catches it
const DUE_WINDOW_SECONDS: i64 = 60;

/// whether `alarm` is due at `now`: enabled, scheduled on today's
/// weekday, and `now` has advanced into the target minute
#[must_use]
pub fn due(alarm: &Alarm, now: NaiveDateTime) -> bool {
    if !alarm.enabled || !alarm.matches_day(now.weekday()) {
        return false;
    }
    let since = now.time().signed_duration_since(alarm.time()).num_seconds();
    (0..DUE_WINDOW_SECONDS).contains(&since)
}

/// the earliest future occurrence across all enabled alarms, for the
/// countdown display; ties break by store order, first alarm wins
#[must_use]
pub fn next_occurrence<'a>(
    store: &'a AlarmStore,
    now: NaiveDateTime,
) -> Option<(NaiveDateTime, &'a Alarm)> {
    let mut next: Option<(NaiveDateTime, &Alarm)> = None;
    for alarm in store.iter() {
        if !alarm.enabled {
            continue;
        }
        let today = now.date().and_time(alarm.time());
        if alarm.is_recurring() {
            for day in &alarm.days {
                let ahead = i64::from(
                    (day.weekday().num_days_from_monday() + 7 - now.weekday().num_days_from_monday())
                        % 7,
                );
                let candidate = if ahead == 0 {
                    // scheduled today; if the time already passed, next week
                    if today > now {
                        today
                    } else {
                        today + Duration::days(7)
                    }
                } else {
                    today + Duration::days(ahead)
                };
                consider(&mut next, candidate, alarm);
            }
        } else {
            // one-time: today if still ahead, otherwise tomorrow
            let candidate = if today > now {
                today
            } else {
                today + Duration::days(1)
            };
            consider(&mut next, candidate, alarm);
        }
    }
    next
}

fn consider<'a>(
    next: &mut Option<(NaiveDateTime, &'a Alarm)>,
    candidate: NaiveDateTime,
    alarm: &'a Alarm,
) {
    // strict comparison keeps the earlier store entry on ties
    if next.map_or(true, |(at, _)| candidate < at) {
        *next = Some((candidate, alarm));
    }
}

/// formats a duration until the next alarm the way the countdown line
/// shows it: days only when a day or more out, hours only when an hour
/// or more out, else minutes only
#[must_use]
pub fn countdown(until: Duration) -> String {
    let hours = until.num_hours();
    let minutes = until.num_minutes() % 60;
    if hours >= 24 {
        format!("{}d {}h {}m", hours / 24, hours % 24, minutes)
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// transient ringing state, never persisted
///
/// `fired` records the last date each alarm triggered on, which is
/// what makes a trigger fire at most once per (alarm, date) even
/// though the due window is a whole minute wide
#[derive(Debug, Default)]
pub struct FireState {
    ringing: Vec<u64>,
    fired: HashMap<u64, NaiveDate>,
}

impl FireState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// one poll step: returns the alarms that newly trigger at `now`,
    /// marking each as ringing and as fired for today's date
    pub fn tick<'a>(&mut self, store: &'a AlarmStore, now: NaiveDateTime) -> Vec<&'a Alarm> {
        let mut triggered = Vec::new();
        for alarm in store.iter() {
            if !due(alarm, now) {
                continue;
            }
            if self.fired.get(&alarm.id) == Some(&now.date()) {
                continue;
            }
            self.fired.insert(alarm.id, now.date());
            // an alarm left ringing overnight re-triggers but must not
            // end up in the ringing set twice
            if !self.ringing.contains(&alarm.id) {
                self.ringing.push(alarm.id);
            }
            triggered.push(alarm);
        }
        triggered
    }

    #[must_use]
    pub fn is_ringing(&self, id: u64) -> bool {
        self.ringing.contains(&id)
    }

    #[must_use]
    pub fn ringing(&self) -> &[u64] {
        &self.ringing
    }

    /// acknowledges a ringing alarm; returns false if it wasn't ringing
    pub fn stop(&mut self, id: u64) -> bool {
        match self.ringing.iter().position(|ringing| *ringing == id) {
            Some(index) => {
                self.ringing.remove(index);
                true
            }
            None => false,
        }
    }

    /// stops the ringing alarm and appends a derived one-time alarm at
    /// `now` plus the snooze delay: same ringtone, prefixed label,
    /// fresh id; the original alarm is untouched. Returns the new id.
    pub fn snooze(&mut self, store: &mut AlarmStore, id: u64, now: NaiveDateTime) -> Option<u64> {
        let alarm = store.get(id)?;
        let at = now + Duration::minutes(SNOOZE_MINUTES);
        let derived = Alarm {
            id: 0,
            hour: at.hour(),
            minute: at.minute(),
            label: format!("Snooze: {}", alarm.label),
            days: Vec::new(),
            ringtone: alarm.ringtone.clone(),
            enabled: true,
            created: now,
        };
        self.stop(id);
        Some(store.add(derived))
    }

    /// drops every trace of an alarm, for when the host deletes it;
    /// a deleted alarm must not linger as ringing
    pub fn forget(&mut self, id: u64) {
        self.stop(id);
        self.fired.remove(&id);
    }
}
