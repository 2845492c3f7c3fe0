//! Wire types shared by the Lightfield server and installation host.
//!
//! Everything here is plain data with serde derives. JSON field names follow
//! what the drawing tablets and the installation already speak, so renaming a
//! field here is a protocol break.

pub mod command;
pub mod drawing;
pub mod kind;

pub use command::{CommandEntry, CommandKind, ErrorBody, PollResponse};
pub use drawing::{DrawingDimensions, DrawingInfo, DrawingStatus, DrawingUpdate, IndexChange, IndexResponse};
pub use kind::{Facing, ImageKind};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid command type '{0}'")]
    CommandKind(String),
    #[error("unknown image kind character '{0}'")]
    KindChar(char),
    #[error("unknown facing character '{0}'")]
    FacingChar(char),
}
