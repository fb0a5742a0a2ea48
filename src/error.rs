use std::fmt;

use crate::world::AgentId;

#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    InvalidConstant { field: &'static str, value: i64 },
    ArenaFull { grid_count: i32, attempts: u32 },
    UnknownAgent { id: AgentId },
    UnknownPreset { name: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConstant { field, value } => {
                write!(f, "invalid game constant {field}={value}")
            }
            Self::ArenaFull {
                grid_count,
                attempts,
            } => write!(
                f,
                "no free spawn block on {grid_count}x{grid_count} grid after {attempts} attempts"
            ),
            Self::UnknownAgent { id } => write!(f, "unknown agent #{id}"),
            Self::UnknownPreset { name } => write!(f, "unknown bot preset '{name}'"),
        }
    }
}

impl std::error::Error for EngineError {}
