//! In-memory host. Remembers every side effect so tests and replays can look at it afterwards.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs::File,
    io::Read,
    path::Path,
};

use rand::{rngs::StdRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    defs::{
        CharacterProfile, Coordinates, EntityUid, Event, JobId, Mind, SessionId, SpawnPoint, StationConfig,
        StationId,
    },
    error::{HostError, HostResult},
    services::{ChatManager, EntityQueries, GameTicker, RandomSource, StationSpawning},
};

/////////////////////////////////////////////////////////////////////
/////////////////////// Scenario ////////////////////////////////////
/////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationDef {
    pub id: StationId,
    /// Leave out to get a station without job configuration.
    #[serde(default)]
    pub jobs: Option<Vec<JobId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPointDef {
    pub entity: EntityUid,
    #[serde(default)]
    pub job: Option<JobId>,
    #[serde(default)]
    pub station: Option<StationId>,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindDef {
    pub entity: EntityUid,
    #[serde(default)]
    pub session: Option<SessionId>,
    #[serde(default)]
    pub job: Option<JobId>,
}

/// A world plus the events the host raises in it, in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub stations: Vec<StationDef>,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPointDef>,
    #[serde(default)]
    pub minds: Vec<MindDef>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        info!("Loading scenario {}", path.as_ref().to_string_lossy());
        let mut file = File::open(path)?;
        let mut s = String::new();
        file.read_to_string(&mut s)?;
        Self::from_yaml(&s)
    }

    pub fn from_yaml(s: &str) -> HostResult<Self> {
        Ok(serde_yaml::from_str(s)?)
    }
}

/////////////////////////////////////////////////////////////////////
/////////////////////// SimHost /////////////////////////////////////
/////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRecord {
    pub entity: EntityUid,
    pub coordinates: Coordinates,
    pub job: Option<JobId>,
    pub profile: Option<CharacterProfile>,
    pub station: Option<StationId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerCall {
    EndRound,
    RestartRound,
    Respawn(SessionId),
}

#[derive(Debug, Clone)]
struct SimSpawnPoint {
    job: Option<JobId>,
    station: Option<StationId>,
    coordinates: Coordinates,
}

#[derive(Debug)]
pub struct SimHost {
    stations: BTreeMap<StationId, Option<StationConfig>>,
    spawn_points: BTreeMap<EntityUid, SimSpawnPoint>,
    minds: HashMap<EntityUid, Mind>,
    rng: StdRng,
    next_entity: u64,

    announcements: Vec<String>,
    spawned: Vec<SpawnRecord>,
    ticker_calls: Vec<TickerCall>,
}

/// Spawned mobs get ids from here upwards unless the world already uses bigger ones.
const FIRST_SPAWNED_ENTITY: u64 = 10_000;

impl SimHost {
    pub fn new(seed: u64) -> Self {
        Self {
            stations: BTreeMap::new(),
            spawn_points: BTreeMap::new(),
            minds: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
            next_entity: FIRST_SPAWNED_ENTITY,
            announcements: Vec::new(),
            spawned: Vec::new(),
            ticker_calls: Vec::new(),
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> HostResult<Self> {
        let mut host = Self::new(scenario.seed);
        for station in &scenario.stations {
            host.add_station(station.id, station.jobs.clone());
        }

        let mut seen = BTreeSet::new();
        for sp in &scenario.spawn_points {
            if !seen.insert(sp.entity) {
                return Err(HostError::DuplicateEntity(sp.entity));
            }
            if let Some(station) = sp.station {
                if !host.stations.contains_key(&station) {
                    return Err(HostError::UnknownStation {
                        spawn_point: sp.entity,
                        station,
                    });
                }
            }
            host.add_spawn_point(sp.entity, sp.job.clone(), sp.station, sp.coordinates);
        }
        for mind in &scenario.minds {
            if !seen.insert(mind.entity) {
                return Err(HostError::DuplicateEntity(mind.entity));
            }
            host.set_mind(mind.entity, Mind {
                session: mind.session.clone(),
                current_job: mind.job.clone(),
            });
        }

        debug!(
            "Scenario world: {} stations, {} spawn points, {} minds, {} events.",
            host.stations.len(),
            host.spawn_points.len(),
            host.minds.len(),
            scenario.events.len(),
        );
        Ok(host)
    }

    pub fn add_station(&mut self, station: StationId, jobs: Option<Vec<JobId>>) {
        let config = jobs.map(|available_jobs| StationConfig { available_jobs });
        self.stations.insert(station, config);
    }

    pub fn add_spawn_point(
        &mut self,
        entity: EntityUid,
        job: Option<JobId>,
        station: Option<StationId>,
        coordinates: Coordinates,
    ) {
        self.bump_next_entity(entity);
        self.spawn_points.insert(entity, SimSpawnPoint { job, station, coordinates });
    }

    pub fn set_mind(&mut self, entity: EntityUid, mind: Mind) {
        self.bump_next_entity(entity);
        self.minds.insert(entity, mind);
    }

    fn bump_next_entity(&mut self, taken: EntityUid) {
        self.next_entity = self.next_entity.max(taken.0 + 1);
    }

    pub fn announcements(&self) -> &[String] {
        &self.announcements
    }

    pub fn spawned(&self) -> &[SpawnRecord] {
        &self.spawned
    }

    pub fn ticker_calls(&self) -> &[TickerCall] {
        &self.ticker_calls
    }

    pub fn rounds_restarted(&self) -> usize {
        self.ticker_calls.iter().filter(|&c| *c == TickerCall::RestartRound).count()
    }
}

impl ChatManager for SimHost {
    fn dispatch_server_announcement(&mut self, message: &str) {
        info!("[announce] {}", message);
        self.announcements.push(message.to_owned());
    }
}

impl GameTicker for SimHost {
    fn end_round(&mut self) {
        info!("[ticker] Round ended.");
        self.ticker_calls.push(TickerCall::EndRound);
    }

    fn restart_round(&mut self) {
        info!("[ticker] Round restarting.");
        self.ticker_calls.push(TickerCall::RestartRound);
    }

    fn respawn(&mut self, session: &SessionId) {
        info!("[ticker] Respawning {}.", session);
        self.ticker_calls.push(TickerCall::Respawn(session.clone()));
    }
}

impl StationSpawning for SimHost {
    fn spawn_player_mob(
        &mut self,
        coordinates: Coordinates,
        job: Option<&JobId>,
        profile: Option<&CharacterProfile>,
        station: Option<StationId>,
    ) -> EntityUid {
        let entity = EntityUid(self.next_entity);
        self.next_entity += 1;
        debug!("[spawning] {} at {} as {:?}", entity, coordinates, job);
        self.spawned.push(SpawnRecord {
            entity,
            coordinates,
            job: job.cloned(),
            profile: profile.cloned(),
            station,
        });
        entity
    }
}

impl EntityQueries for SimHost {
    fn spawn_points(&self) -> Vec<SpawnPoint> {
        self.spawn_points
            .iter()
            .map(|(&entity, sp)| SpawnPoint {
                entity,
                job: sp.job.clone(),
            })
            .collect()
    }

    fn station_config(&self, station: StationId) -> Option<&StationConfig> {
        self.stations.get(&station).and_then(Option::as_ref)
    }

    fn mind(&self, entity: EntityUid) -> Option<&Mind> {
        self.minds.get(&entity)
    }

    fn owning_station(&self, entity: EntityUid) -> Option<StationId> {
        self.spawn_points.get(&entity).and_then(|sp| sp.station)
    }

    fn coordinates(&self, entity: EntityUid) -> Option<Coordinates> {
        self.spawn_points.get(&entity).map(|sp| sp.coordinates)
    }
}

impl RandomSource for SimHost {
    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }
}
