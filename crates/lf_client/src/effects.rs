use std::collections::HashMap;

use lf_protocol::CommandKind;

use crate::record::RecordId;

/// Countdown timers for transient per-drawing effects (wiggle, glimmer).
///
/// Restarting an active effect resets its timer to the full duration. Ticked
/// every host frame; polling has no influence on when effects end.
#[derive(Debug)]
pub struct EffectTable {
    duration: f32,
    timers: HashMap<(RecordId, CommandKind), f32>,
}

impl EffectTable {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration: duration_secs,
            timers: HashMap::new(),
        }
    }

    pub fn start(&mut self, record: RecordId, kind: CommandKind) {
        self.timers.insert((record, kind), self.duration);
    }

    pub fn is_active(&self, record: &RecordId, kind: CommandKind) -> bool {
        self.timers.contains_key(&(record.clone(), kind))
    }

    /// Advance all timers by `dt` seconds and return the effects that ran out.
    pub fn tick(&mut self, dt: f32) -> Vec<(RecordId, CommandKind)> {
        let mut expired = Vec::new();
        self.timers.retain(|key, remaining| {
            *remaining -= dt;
            if *remaining <= 0.0 {
                expired.push(key.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Forget every timer of a removed record.
    pub fn cancel_record(&mut self, record: &RecordId) {
        self.timers.retain(|(id, _), _| id != record);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_expires_after_duration() {
        let mut table = EffectTable::new(1.0);
        let a = RecordId::from("a");
        table.start(a.clone(), CommandKind::Wiggle);

        assert!(table.tick(0.6).is_empty());
        assert!(table.is_active(&a, CommandKind::Wiggle));
        let expired = table.tick(0.5);
        assert_eq!(expired, vec![(a.clone(), CommandKind::Wiggle)]);
        assert!(!table.is_active(&a, CommandKind::Wiggle));
    }

    #[test]
    fn restart_resets_the_timer() {
        let mut table = EffectTable::new(1.0);
        let a = RecordId::from("a");
        table.start(a.clone(), CommandKind::Glimmer);
        table.tick(0.8);
        table.start(a.clone(), CommandKind::Glimmer);
        assert!(table.tick(0.8).is_empty());
        assert_eq!(table.tick(0.3).len(), 1);
    }

    #[test]
    fn kinds_are_timed_independently() {
        let mut table = EffectTable::new(1.0);
        let a = RecordId::from("a");
        table.start(a.clone(), CommandKind::Wiggle);
        table.tick(0.5);
        table.start(a.clone(), CommandKind::Glimmer);
        assert_eq!(table.tick(0.6), vec![(a.clone(), CommandKind::Wiggle)]);
        assert_eq!(table.len(), 1);
        table.cancel_record(&a);
        assert_eq!(table.len(), 0);
    }
}
