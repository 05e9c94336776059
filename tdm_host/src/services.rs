//! Host subsystems, cut down to what round rules actually call.
//!
//! Every trait takes `&mut self` for commands so fakes can record what happened.

use rand::RngCore;

use crate::defs::{
    CharacterProfile, Coordinates, EntityUid, JobId, Mind, SessionId, SpawnPoint, StationConfig, StationId,
};

pub trait ChatManager {
    /// Sends `message` to every connected player.
    fn dispatch_server_announcement(&mut self, message: &str);
}

pub trait GameTicker {
    fn end_round(&mut self);
    fn restart_round(&mut self);
    /// Respawns the player right away, skipping any respawn timer.
    fn respawn(&mut self, session: &SessionId);
}

pub trait StationSpawning {
    /// Spawns a fresh mob for a player and returns it.
    fn spawn_player_mob(
        &mut self,
        coordinates: Coordinates,
        job: Option<&JobId>,
        profile: Option<&CharacterProfile>,
        station: Option<StationId>,
    ) -> EntityUid;
}

pub trait EntityQueries {
    fn spawn_points(&self) -> Vec<SpawnPoint>;
    /// `None` if the station exists but nobody configured jobs for it, or it doesn't exist at all.
    fn station_config(&self, station: StationId) -> Option<&StationConfig>;
    fn mind(&self, entity: EntityUid) -> Option<&Mind>;
    fn owning_station(&self, entity: EntityUid) -> Option<StationId>;
    fn coordinates(&self, entity: EntityUid) -> Option<Coordinates>;
}

pub trait RandomSource {
    fn rng(&mut self) -> &mut dyn RngCore;
}

/// Everything a rule may touch, as one trait object.
pub trait Host: ChatManager + GameTicker + StationSpawning + EntityQueries + RandomSource {}

impl<T> Host for T where T: ChatManager + GameTicker + StationSpawning + EntityQueries + RandomSource {}
