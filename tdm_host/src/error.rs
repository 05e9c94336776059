use thiserror::Error;

use crate::defs::{EntityUid, StationId};

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Failed to open scenario file")]
    Io(#[from] std::io::Error),
    #[error("Failed to deserialize scenario.")]
    Serde(#[from] serde_yaml::Error),
    #[error("Spawn point {spawn_point} belongs to {station}, which does not exist")]
    UnknownStation {
        spawn_point: EntityUid,
        station: StationId,
    },
    #[error("Entity {0} is defined more than once")]
    DuplicateEntity(EntityUid),
}

pub type HostResult<T> = Result<T, HostError>;
