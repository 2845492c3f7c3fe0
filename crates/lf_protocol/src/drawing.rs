use serde::{Deserialize, Serialize};

use crate::kind::{Facing, ImageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingStatus {
    /// Still being drawn on a tablet.
    Drawing,
    /// Submitted, waiting for moderation.
    Complete,
    Approved,
    Ignored,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawingDimensions {
    pub width: u32,
    pub height: u32,
}

/// What a tablet receives from `GET /drawing` and `GET /drawing/{uuid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingInfo {
    pub uuid: String,
    /// The kind the player was asked to draw.
    pub prompt: ImageKind,
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    pub status: DrawingStatus,
}

/// Body of `POST /drawing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingUpdate {
    pub uuid: String,
    pub json: serde_json::Value,
    #[serde(default)]
    pub dimensions: Option<DrawingDimensions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexChange {
    pub uuid: String,
    pub kind: ImageKind,
    pub facing: Facing,
    pub deleted: bool,
}

/// Body of `GET /drawingindex/{since}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub time: i64,
    pub changes: Vec<IndexChange>,
}
