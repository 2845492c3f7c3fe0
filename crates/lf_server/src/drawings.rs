//! Drawings submitted from the tablets and their moderation lifecycle.
//!
//! ```text
//! Drawing --complete--> Complete --approve--> Approved
//!                          |  ^                  |
//!                       ignore|approve        ignore
//!                          v  |                  v
//!                         Ignored <--------------+
//! any state --delete--> Deleted
//! ```
//!
//! With auto-approve enabled, `complete` goes straight to `Approved`.
//! Approvals and deletions are what the installation's index feed reports.

use std::str::FromStr;

use lf_core::color::Color;
use lf_protocol::{
    DrawingDimensions, DrawingInfo, DrawingStatus, Facing, ImageKind, IndexChange,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kinds the tablets prompt players to draw.
pub const PROMPT_KINDS: [ImageKind; 2] = [ImageKind::Animal, ImageKind::Plant];
pub const PALETTE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub uuid: String,
    pub kind: ImageKind,
    pub facing: Facing,
    pub colors: Vec<String>,
    #[serde(default)]
    pub json: Option<serde_json::Value>,
    #[serde(default)]
    pub dimensions: DrawingDimensions,
    pub status: DrawingStatus,
    pub created: i64,
    pub updated: i64,
    /// Last status change, drives the index feed.
    pub status_changed: i64,
}

impl Drawing {
    pub fn info(&self) -> DrawingInfo {
        DrawingInfo {
            uuid: self.uuid.clone(),
            prompt: self.kind,
            colors: self.colors.clone(),
            json: self.json.clone(),
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingAction {
    Complete,
    Approve,
    Ignore,
    Delete,
}

impl FromStr for DrawingAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "complete" => Ok(DrawingAction::Complete),
            "approve" => Ok(DrawingAction::Approve),
            "ignore" => Ok(DrawingAction::Ignore),
            "delete" => Ok(DrawingAction::Delete),
            other => Err(format!("unknown drawing action '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawingError {
    #[error("invalid drawing uuid")]
    UnknownUuid,
    #[error("cannot {action:?} a drawing in state {from:?}")]
    InvalidTransition {
        action: DrawingAction,
        from: DrawingStatus,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawingTable {
    drawings: Vec<Drawing>,
}

impl DrawingTable {
    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    pub fn get(&self, uuid: &str) -> Option<&Drawing> {
        self.drawings.iter().find(|d| d.uuid == uuid)
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.get(uuid).is_some()
    }

    fn get_mut(&mut self, uuid: &str) -> Result<&mut Drawing, DrawingError> {
        self.drawings
            .iter_mut()
            .find(|d| d.uuid == uuid)
            .ok_or(DrawingError::UnknownUuid)
    }

    /// Start a new drawing with a random prompt, facing and palette.
    pub fn create(&mut self, rng: &mut impl Rng, now: i64) -> &Drawing {
        let kind = PROMPT_KINDS[rng.gen_range(0..PROMPT_KINDS.len())];
        let facing = if rng.gen_bool(0.5) {
            Facing::Left
        } else {
            Facing::Right
        };
        let drawing = Drawing {
            uuid: Uuid::new_v4().to_string(),
            kind,
            facing,
            colors: generate_colors(rng, PALETTE_SIZE),
            json: None,
            dimensions: DrawingDimensions::default(),
            status: DrawingStatus::Drawing,
            created: now,
            updated: now,
            status_changed: now,
        };
        log::info!("Created drawing {} (prompt {})", drawing.uuid, drawing.kind);
        self.drawings.push(drawing);
        let index = self.drawings.len() - 1;
        &self.drawings[index]
    }

    /// Store the latest canvas contents. Deleted drawings reject updates.
    pub fn update(
        &mut self,
        uuid: &str,
        json: serde_json::Value,
        dimensions: Option<DrawingDimensions>,
        now: i64,
    ) -> Result<(), DrawingError> {
        let drawing = self.get_mut(uuid)?;
        if drawing.status == DrawingStatus::Deleted {
            return Err(DrawingError::UnknownUuid);
        }
        drawing.json = Some(json);
        if let Some(dimensions) = dimensions {
            drawing.dimensions = dimensions;
        }
        drawing.updated = now;
        Ok(())
    }

    pub fn apply(
        &mut self,
        uuid: &str,
        action: DrawingAction,
        auto_approve: bool,
        now: i64,
    ) -> Result<DrawingStatus, DrawingError> {
        let drawing = self.get_mut(uuid)?;
        let from = drawing.status;
        let to = next_status(from, action, auto_approve)
            .ok_or(DrawingError::InvalidTransition { action, from })?;
        if to != from {
            drawing.status = to;
            drawing.status_changed = now;
            drawing.updated = now;
            log::info!("Drawing {uuid}: {from:?} -> {to:?}");
        }
        Ok(to)
    }

    /// Approvals and deletions at or after `since`, in creation order.
    pub fn index_since(&self, since: i64) -> Vec<IndexChange> {
        self.drawings
            .iter()
            .filter(|d| d.status_changed >= since)
            .filter_map(|d| {
                let deleted = match d.status {
                    DrawingStatus::Approved => false,
                    DrawingStatus::Deleted | DrawingStatus::Ignored => true,
                    DrawingStatus::Drawing | DrawingStatus::Complete => return None,
                };
                Some(IndexChange {
                    uuid: d.uuid.clone(),
                    kind: d.kind,
                    facing: d.facing,
                    deleted,
                })
            })
            .collect()
    }
}

fn next_status(from: DrawingStatus, action: DrawingAction, auto_approve: bool) -> Option<DrawingStatus> {
    use DrawingStatus::*;
    match (action, from) {
        (DrawingAction::Delete, _) => Some(Deleted),
        (_, Deleted) => None,
        (DrawingAction::Complete, Drawing) | (DrawingAction::Complete, Complete) => {
            Some(if auto_approve { Approved } else { Complete })
        }
        (DrawingAction::Complete, other) => Some(other),
        (DrawingAction::Approve, Complete | Ignored | Approved) => Some(Approved),
        (DrawingAction::Ignore, Complete | Approved | Ignored) => Some(Ignored),
        (DrawingAction::Approve | DrawingAction::Ignore, Drawing) => None,
    }
}

/// Evenly spaced vivid hues starting from a random offset, as `#rrggbb`.
pub fn generate_colors(rng: &mut impl Rng, count: usize) -> Vec<String> {
    let offset: f32 = rng.gen_range(0.0..360.0);
    let step = 360.0 / count.max(1) as f32;
    (0..count)
        .map(|i| Color::from_hsv(offset + step * i as f32, 0.85, 0.95).to_hex())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table_with_drawing() -> (DrawingTable, String) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut table = DrawingTable::default();
        let uuid = table.create(&mut rng, 10).uuid.clone();
        (table, uuid)
    }

    #[test]
    fn create_assigns_prompt_and_palette() {
        let (table, uuid) = table_with_drawing();
        let drawing = table.get(&uuid).expect("drawing should exist");
        assert!(PROMPT_KINDS.contains(&drawing.kind));
        assert_eq!(drawing.colors.len(), PALETTE_SIZE);
        assert!(drawing.colors.iter().all(|c| c.len() == 7 && c.starts_with('#')));
        assert_eq!(drawing.status, DrawingStatus::Drawing);
        assert!(Uuid::parse_str(&uuid).is_ok());
    }

    #[test]
    fn update_unknown_uuid_is_rejected() {
        let (mut table, _) = table_with_drawing();
        let result = table.update("nope", serde_json::json!({}), None, 20);
        assert_eq!(result, Err(DrawingError::UnknownUuid));
    }

    #[test]
    fn update_stores_json_and_dimensions() {
        let (mut table, uuid) = table_with_drawing();
        let dims = DrawingDimensions { width: 320, height: 200 };
        table
            .update(&uuid, serde_json::json!({"objects": [1]}), Some(dims), 20)
            .expect("update should succeed");
        let drawing = table.get(&uuid).expect("drawing should exist");
        assert_eq!(drawing.dimensions, dims);
        assert_eq!(drawing.updated, 20);
    }

    #[test]
    fn moderation_flow_feeds_index() {
        let (mut table, uuid) = table_with_drawing();
        assert!(table.index_since(0).is_empty());

        assert_eq!(table.apply(&uuid, DrawingAction::Complete, false, 20), Ok(DrawingStatus::Complete));
        assert!(table.index_since(0).is_empty());

        assert_eq!(table.apply(&uuid, DrawingAction::Approve, false, 30), Ok(DrawingStatus::Approved));
        let changes = table.index_since(30);
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].deleted);
        assert!(table.index_since(31).is_empty());

        table.apply(&uuid, DrawingAction::Delete, false, 40).expect("delete");
        let changes = table.index_since(31);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].deleted);
    }

    #[test]
    fn auto_approve_skips_moderation() {
        let (mut table, uuid) = table_with_drawing();
        assert_eq!(table.apply(&uuid, DrawingAction::Complete, true, 20), Ok(DrawingStatus::Approved));
    }

    #[test]
    fn cannot_approve_unfinished_or_revive_deleted() {
        let (mut table, uuid) = table_with_drawing();
        assert!(matches!(
            table.apply(&uuid, DrawingAction::Approve, false, 20),
            Err(DrawingError::InvalidTransition { .. })
        ));
        table.apply(&uuid, DrawingAction::Delete, false, 30).expect("delete");
        assert!(matches!(
            table.apply(&uuid, DrawingAction::Complete, false, 40),
            Err(DrawingError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn action_names_parse() {
        assert_eq!("approve".parse::<DrawingAction>(), Ok(DrawingAction::Approve));
        assert!("publish".parse::<DrawingAction>().is_err());
    }
}
