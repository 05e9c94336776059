//! Various definitions pertaining to the host engine, such as
//! - Entities, stations, jobs and sessions
//! - Minds and spawn points
//! - Events the host raises for rules (station initialized, mob died, ...)

use serde::{Deserialize, Serialize};
use std::{
    borrow::Borrow,
    fmt::{Display, Formatter},
};

/////////////////////////////////////////////////////////////////////
/////////////////////// Ids /////////////////////////////////////////
/////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityUid(pub u64);

impl Display for EntityUid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stations are entities too in the host, but rules never mix them up with mobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u64);

impl Display for StationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "station#{}", self.0)
    }
}

/// A connected player's network session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/////////////////////////////////////////////////////////////////////
/////////////////////// Job /////////////////////////////////////////
/////////////////////////////////////////////////////////////////////

/// Job prototype id, e.g. `"Security"`. Opaque to the host contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Stand-in for minds which have no job assigned.
    pub const NONE: &'static str = "none";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn none() -> Self {
        Self::new(Self::NONE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/////////////////////////////////////////////////////////////////////
/////////////////////// World ///////////////////////////////////////
/////////////////////////////////////////////////////////////////////

/// Position on the map, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f32,
    pub y: f32,
}

impl Coordinates {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MobState {
    Alive,
    Critical,
    Dead,
}

/// The persistent identity of a player, attached to whatever mob they control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mind {
    #[serde(default)]
    pub session: Option<SessionId>,
    #[serde(default)]
    pub current_job: Option<JobId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub entity: EntityUid,
    /// `None` means the spawn point is not reserved for a job.
    pub job: Option<JobId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    pub available_jobs: Vec<JobId>,
}

/////////////////////////////////////////////////////////////////////
/////////////////////// Event ///////////////////////////////////////
/////////////////////////////////////////////////////////////////////

/// Raised before the host spawns a player. Whoever sets `handled` owns the spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpawningEvent {
    #[serde(default)]
    pub job: Option<JobId>,
    #[serde(default)]
    pub station: Option<StationId>,
    #[serde(default)]
    pub profile: Option<CharacterProfile>,
    #[serde(default)]
    pub handled: bool,
    #[serde(default)]
    pub spawn_result: Option<EntityUid>,
}

impl PlayerSpawningEvent {
    pub fn new(job: Option<JobId>, station: Option<StationId>, profile: Option<CharacterProfile>) -> Self {
        Self {
            job,
            station,
            profile,
            handled: false,
            spawn_result: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    StationInitialized {
        station: StationId,
    },
    PlayerSpawning(PlayerSpawningEvent),
    MobStateChanged {
        entity: EntityUid,
        new_state: MobState,
    },
    GhostAttempt {
        mind: Option<Mind>,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn job_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(JobId::from("Security"), 3);
        assert_eq!(map.get("Security"), Some(&3));
        assert_eq!(map.get(JobId::NONE), None);
    }

    #[test]
    fn events_from_yaml() {
        let yaml = r#"
- StationInitialized: { station: 1 }
- PlayerSpawning: { job: Security, station: 1 }
- MobStateChanged: { entity: 7, new_state: Dead }
- GhostAttempt: { mind: { session: alice } }
- GhostAttempt: { mind: ~ }
"#;
        let events: Vec<Event> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(events[0], Event::StationInitialized { station: StationId(1) });
        assert_eq!(
            events[1],
            Event::PlayerSpawning(PlayerSpawningEvent::new(Some("Security".into()), Some(StationId(1)), None))
        );
        assert_eq!(events[2], Event::MobStateChanged { entity: EntityUid(7), new_state: MobState::Dead });
        assert_eq!(
            events[3],
            Event::GhostAttempt { mind: Some(Mind { session: Some("alice".into()), current_job: None }) }
        );
        assert_eq!(events[4], Event::GhostAttempt { mind: None });
    }
}
