use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// The closed set of commands a drawing tablet can send to its creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandKind {
    Wiggle,
    Glimmer,
    Spawn,
}

impl CommandKind {
    pub const ALL: [CommandKind; 3] = [CommandKind::Wiggle, CommandKind::Glimmer, CommandKind::Spawn];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Wiggle => "WIGGLE",
            CommandKind::Glimmer => "GLIMMER",
            CommandKind::Spawn => "SPAWN",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `wiggle`, `Wiggle` and `WIGGLE` are the same command.
impl FromStr for CommandKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::CommandKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub uuid: String,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub num: u32,
}

/// Body of every `GET /command/...` query.
///
/// `time` is the server clock (ms since epoch) at query time. Clients send it
/// back as `since` on their next poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    pub time: i64,
    pub commands: Vec<CommandEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
