//! Durable command counters.
//!
//! One counter per `(drawing uuid, command kind)`. Tablets bump a counter with
//! `add`, the installation consumes it and resets it with `clear`. Entries are
//! never removed: a cleared entry stays at zero so pollers can tell "nothing
//! pending" from "never seen".

use lf_protocol::{CommandEntry, CommandKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub uuid: String,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub num: u32,
    /// Last mutation, ms since epoch.
    pub updated: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandTable {
    entries: Vec<CommandRecord>,
}

impl CommandTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_mut(&mut self, uuid: &str, kind: CommandKind) -> Option<&mut CommandRecord> {
        self.entries
            .iter_mut()
            .find(|entry| entry.kind == kind && entry.uuid == uuid)
    }

    /// Increase the pending count and return the new value.
    pub fn add(&mut self, uuid: &str, kind: CommandKind, delta: u32, now: i64) -> u32 {
        if let Some(entry) = self.find_mut(uuid, kind) {
            entry.num = entry.num.saturating_add(delta);
            entry.updated = now;
            return entry.num;
        }
        self.entries.push(CommandRecord {
            uuid: uuid.to_string(),
            kind,
            num: delta,
            updated: now,
        });
        delta
    }

    /// Reset the pending count to zero and stamp the entry, creating it at
    /// zero if the key was never added. Returns the count that was pending.
    pub fn clear(&mut self, uuid: &str, kind: CommandKind, now: i64) -> u32 {
        if let Some(entry) = self.find_mut(uuid, kind) {
            let pending = entry.num;
            entry.num = 0;
            entry.updated = now;
            return pending;
        }
        self.entries.push(CommandRecord {
            uuid: uuid.to_string(),
            kind,
            num: 0,
            updated: now,
        });
        0
    }

    /// Entries touched at or after `since`, optionally narrowed by kind and uuid.
    pub fn query(&self, kind: Option<CommandKind>, uuid: Option<&str>, since: i64) -> Vec<CommandEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.updated >= since)
            .filter(|entry| kind.map_or(true, |k| entry.kind == k))
            .filter(|entry| uuid.map_or(true, |u| entry.uuid == u))
            .map(|entry| CommandEntry {
                uuid: entry.uuid.clone(),
                kind: entry.kind,
                num: entry.num,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates_per_key() {
        let mut table = CommandTable::default();
        assert_eq!(table.add("u1", CommandKind::Wiggle, 1, 100), 1);
        assert_eq!(table.add("u1", CommandKind::Wiggle, 1, 101), 2);
        assert_eq!(table.add("u1", CommandKind::Glimmer, 5, 102), 5);
        assert_eq!(table.len(), 2);

        let wiggles = table.query(Some(CommandKind::Wiggle), Some("u1"), 0);
        assert_eq!(wiggles.len(), 1);
        assert_eq!(wiggles[0].num, 2);
    }

    #[test]
    fn clear_resets_and_stamps_every_time() {
        let mut table = CommandTable::default();
        table.add("u1", CommandKind::Spawn, 3, 100);
        assert_eq!(table.clear("u1", CommandKind::Spawn, 200), 3);
        assert_eq!(table.clear("u1", CommandKind::Spawn, 300), 0);

        let entries = table.query(None, None, 0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].num, 0);
        // The second clear still moves the timestamp forward.
        let recent = table.query(None, None, 300);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].num, 0);
    }

    #[test]
    fn clear_of_unknown_key_creates_zero_entry() {
        let mut table = CommandTable::default();
        assert_eq!(table.clear("ghost", CommandKind::Wiggle, 100), 0);
        assert_eq!(table.len(), 1);
        let entries = table.query(Some(CommandKind::Wiggle), Some("ghost"), 100);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].num, 0);

        // Still one entry per key after a later add and clear.
        table.add("ghost", CommandKind::Wiggle, 2, 150);
        table.clear("ghost", CommandKind::Wiggle, 160);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn query_filters_by_since_kind_and_uuid() {
        let mut table = CommandTable::default();
        table.add("u1", CommandKind::Wiggle, 1, 100);
        table.add("u2", CommandKind::Wiggle, 1, 200);
        table.add("u2", CommandKind::Spawn, 1, 300);

        assert_eq!(table.query(None, None, 200).len(), 2);
        assert_eq!(table.query(None, None, 301).len(), 0);
        assert_eq!(table.query(Some(CommandKind::Wiggle), None, 0).len(), 2);
        assert_eq!(table.query(Some(CommandKind::Wiggle), Some("u2"), 0).len(), 1);
        assert_eq!(table.query(None, Some("u1"), 150).len(), 0);
    }

    #[test]
    fn counts_saturate_instead_of_wrapping() {
        let mut table = CommandTable::default();
        table.add("u1", CommandKind::Wiggle, u32::MAX, 1);
        assert_eq!(table.add("u1", CommandKind::Wiggle, 10, 2), u32::MAX);
    }
}
