use crate::alarm::Alarm;

/// in-memory ordered collection of alarms, the sole owner of alarm
/// identity and enabled state; insertion order is the only defined
/// order and is what ties in next-occurrence computation break on
#[derive(Debug, Default)]
pub struct AlarmStore {
    alarms: Vec<Alarm>,
    next_id: u64,
}

impl AlarmStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            alarms: Vec::new(),
            next_id: 1,
        }
    }

    /// rebuild from persisted alarms, reseeding the id counter above
    /// the highest loaded id so fresh ids never collide
    #[must_use]
    pub fn from_alarms(alarms: Vec<Alarm>) -> Self {
        let next_id = alarms.iter().map(|alarm| alarm.id).max().unwrap_or(0) + 1;
        Self { alarms, next_id }
    }

    /// assigns a fresh id, appends, and returns the id
    pub fn add(&mut self, mut alarm: Alarm) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        alarm.id = id;
        self.alarms.push(alarm);
        id
    }

    /// removes and returns the matching alarm, `None` if the id is unknown
    pub fn remove(&mut self, id: u64) -> Option<Alarm> {
        let index = self.alarms.iter().position(|alarm| alarm.id == id)?;
        Some(self.alarms.remove(index))
    }

    /// flips enabled state; returns false if the id is unknown
    pub fn set_enabled(&mut self, id: u64, enabled: bool) -> bool {
        match self.alarms.iter_mut().find(|alarm| alarm.id == id) {
            Some(alarm) => {
                alarm.enabled = enabled;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    /// snapshot in insertion order
    #[must_use]
    pub fn all(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alarm> {
        self.alarms.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::default_ringtone;
    use chrono::NaiveDate;

    fn alarm(hour: u32, minute: u32) -> Alarm {
        let created = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Alarm::new(hour, minute, format!("{hour:02}:{minute:02}"), vec![], default_ringtone(), created)
            .unwrap()
    }

    #[test]
    fn add_assigns_unique_ids_in_insertion_order() {
        let mut store = AlarmStore::new();
        let first = store.add(alarm(8, 0));
        let second = store.add(alarm(9, 0));
        assert_ne!(first, second);
        let ids: Vec<u64> = store.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn remove_unknown_id_is_not_found() {
        let mut store = AlarmStore::new();
        store.add(alarm(8, 0));
        assert!(store.remove(99).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_preserves_order_of_the_rest() {
        let mut store = AlarmStore::new();
        let first = store.add(alarm(8, 0));
        let second = store.add(alarm(9, 0));
        let third = store.add(alarm(10, 0));
        assert!(store.remove(second).is_some());
        let ids: Vec<u64> = store.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first, third]);
    }

    #[test]
    fn set_enabled_flips_state_and_reports_unknown_ids() {
        let mut store = AlarmStore::new();
        let id = store.add(alarm(8, 0));
        assert!(store.set_enabled(id, false));
        assert!(!store.get(id).unwrap().enabled);
        assert!(store.set_enabled(id, true));
        assert!(store.get(id).unwrap().enabled);
        assert!(!store.set_enabled(99, false));
    }

    #[test]
    fn reloaded_store_never_reuses_a_persisted_id() {
        let mut store = AlarmStore::new();
        store.add(alarm(8, 0));
        let kept = store.add(alarm(9, 0));
        store.remove(1);
        let mut reloaded = AlarmStore::from_alarms(store.all().to_vec());
        let fresh = reloaded.add(alarm(10, 0));
        assert!(fresh > kept);
    }
}
