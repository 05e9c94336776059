//! Team deathmatch between all jobs of a station.
//!
//! Every death counts against the job of whoever died. The first job to reach
//! `death_threshold` deaths loses, and the round is ended and restarted.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tdm_host::{EntityUid, Event, Host, JobId, Mind, MobState, PlayerSpawningEvent, StationId};

use crate::tally::DeathTally;
use crate::{ConfigError, Plugin};

pub const DEFAULT_DEATH_THRESHOLD: u32 = 100;

fn const_true() -> bool { true }
fn default_death_threshold() -> u32 { DEFAULT_DEATH_THRESHOLD }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	#[serde(default = "const_true")]
	pub enabled: bool,

	/// Deaths within a single job which end the round.
	#[serde(default = "default_death_threshold")]
	pub death_threshold: u32,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			enabled: true,
			death_threshold: DEFAULT_DEATH_THRESHOLD,
		}
	}
}

/// State of the round currently being played. Opened when the station is
/// initialized, closed as soon as we ask the ticker to end the round.
#[derive(Debug)]
pub struct RoundSession {
	round: u64,
	station: StationId,
	tally: DeathTally,
}

impl RoundSession {
	pub fn round(&self) -> u64 {
		self.round
	}

	pub fn station(&self) -> StationId {
		self.station
	}

	pub fn tally(&self) -> &DeathTally {
		&self.tally
	}
}

pub struct TeamDeathmatch {
	config: Config,
	rounds_opened: u64,
	session: Option<RoundSession>,
}

impl TeamDeathmatch {
	pub fn new(config: Config) -> Result<Self, ConfigError> {
		if config.death_threshold == 0 {
			return Err(ConfigError::Invalid(format!("{}: death_threshold must be at least 1", Self::NAME)));
		}
		Ok(Self {
			config,
			rounds_opened: 0,
			session: None,
		})
	}

	pub fn session(&self) -> Option<&RoundSession> {
		self.session.as_ref()
	}

	fn station_initialized(&mut self, host: &mut dyn Host, station: StationId) {
		match host.station_config(station) {
			Some(config) => {
				self.rounds_opened += 1;
				let tally = DeathTally::new(config.available_jobs.iter().cloned());
				info!("Round {} on {}: counting deaths for {} jobs, {} deaths end the round.",
					self.rounds_opened, station, tally.len(), self.config.death_threshold);
				self.session = Some(RoundSession {
					round: self.rounds_opened,
					station,
					tally,
				});
			}
			None => {
				warn!("{} has no job configuration, deaths will not be counted until the next station is initialized.", station);
				self.session = None;
			}
		}
	}

	fn player_spawning(&self, host: &mut dyn Host, ev: &mut PlayerSpawningEvent) {
		if ev.handled {
			return;
		}

		// Shuffled so that players don't all pile up on the first spawn point.
		let mut points = host.spawn_points();
		points.shuffle(host.rng());

		for point in points {
			if let Some(station) = ev.station {
				if host.owning_station(point.entity) != Some(station) {
					continue;
				}
			}
			if ev.job.is_some() && point.job != ev.job {
				continue;
			}
			let coordinates = match host.coordinates(point.entity) {
				Some(coordinates) => coordinates,
				None => {
					debug!("Spawn point {} has no position, skipping.", point.entity);
					continue;
				}
			};

			let mob = host.spawn_player_mob(coordinates, ev.job.as_ref(), ev.profile.as_ref(), ev.station);
			debug!("Spawned {} at {} ({}) for job {:?}.", mob, point.entity, coordinates, ev.job);
			ev.handled = true;
			ev.spawn_result = Some(mob);
			return;
		}

		debug!("No spawn point for job {:?} on {:?}, leaving the spawn to someone else.", ev.job, ev.station);
	}

	fn mob_state_changed(&mut self, host: &mut dyn Host, entity: EntityUid, new_state: MobState) {
		if new_state != MobState::Dead {
			return;
		}
		let job = match host.mind(entity) {
			Some(mind) => mind.current_job.clone().unwrap_or_else(JobId::none),
			None => {
				trace!("{} died without a mind, not counting.", entity);
				return;
			}
		};

		let threshold = self.config.death_threshold;
		let session = match self.session.as_mut() {
			Some(session) => session,
			None => {
				debug!("{} ({}) died while no round is being counted, ignoring.", entity, job);
				return;
			}
		};
		let deaths = match session.tally.record_death(&job) {
			Some(deaths) => deaths,
			None => {
				debug!("{} died as {}, which is not counted in round {}.", entity, job, session.round);
				return;
			}
		};

		if deaths == threshold {
			info!("{} reached {} deaths, ending round {}.", job, deaths, session.round);
			let msg = format!("Game ended!\n{}", session.tally.ranking());
			host.dispatch_server_announcement(&msg);
			self.session = None;
			host.end_round();
			host.restart_round();
		} else {
			trace!("{} death #{} in round {}.", job, deaths, session.round);
			host.dispatch_server_announcement(&format!(
				"{} has lost warrior! {} to restart!",
				job,
				threshold.saturating_sub(deaths),
			));
		}
	}

	fn ghost_attempt(&self, host: &mut dyn Host, mind: Option<&Mind>) {
		match mind.and_then(|mind| mind.session.as_ref()) {
			Some(session) => {
				debug!("{} ghosted, respawning right away.", session);
				host.respawn(session);
			}
			None => trace!("Ghost attempt without a session, nothing to respawn."),
		}
	}
}

impl Plugin for TeamDeathmatch {
	const NAME: &'static str = "teamdeathmatch";

	fn enabled(&self) -> bool {
		self.config.enabled
	}

	fn start(&mut self, _host: &mut dyn Host) {
		info!("Selected TeamDeathMatch!");
	}

	fn event(&mut self, host: &mut dyn Host, ev: &mut Event) {
		match ev {
			Event::StationInitialized { station } => self.station_initialized(host, *station),
			Event::PlayerSpawning(spawning) => self.player_spawning(host, spawning),
			Event::MobStateChanged { entity, new_state } => self.mob_state_changed(host, *entity, *new_state),
			Event::GhostAttempt { mind } => self.ghost_attempt(host, mind.as_ref()),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::collections::BTreeSet;
	use tdm_host::sim::{SimHost, TickerCall};
	use tdm_host::{CharacterProfile, Coordinates, SessionId};

	const S: StationId = StationId(1);
	const OTHER: StationId = StationId(2);

	fn job(s: &str) -> JobId {
		JobId::from(s)
	}

	fn tdm(death_threshold: u32) -> TeamDeathmatch {
		TeamDeathmatch::new(Config { enabled: true, death_threshold }).unwrap()
	}

	fn seeded_host(seed: u64, jobs: &[&str]) -> SimHost {
		let mut host = SimHost::new(seed);
		host.add_station(S, Some(jobs.iter().map(|&j| job(j)).collect()));
		host
	}

	fn host_with_jobs(jobs: &[&str]) -> SimHost {
		seeded_host(1, jobs)
	}

	/// Registers a player with `job` on entity `id` and returns the entity.
	fn player(host: &mut SimHost, id: u64, job_id: Option<&str>) -> EntityUid {
		let entity = EntityUid(id);
		host.set_mind(entity, Mind {
			session: Some(SessionId(format!("player{}", id))),
			current_job: job_id.map(job),
		});
		entity
	}

	fn die(plugin: &mut TeamDeathmatch, host: &mut SimHost, entity: EntityUid) {
		plugin.event(host, &mut Event::MobStateChanged { entity, new_state: MobState::Dead });
	}

	fn init(plugin: &mut TeamDeathmatch, host: &mut SimHost, station: StationId) {
		plugin.event(host, &mut Event::StationInitialized { station });
	}

	#[test]
	fn station_initialized_tallies_every_job() {
		let mut host = host_with_jobs(&["Security", "Engineer"]);
		let mut plugin = tdm(100);
		init(&mut plugin, &mut host, S);

		let session = plugin.session().unwrap();
		assert_eq!(session.round(), 1);
		assert_eq!(session.station(), S);
		assert_eq!(session.tally().counts(), &btreemap! {
			job("Engineer") => 0,
			job("Security") => 0,
		});

		// a second initialization replaces the tally wholesale
		let sec = player(&mut host, 100, Some("Security"));
		die(&mut plugin, &mut host, sec);
		host.add_station(OTHER, Some(vec![job("Medic")]));
		init(&mut plugin, &mut host, OTHER);
		let session = plugin.session().unwrap();
		assert_eq!(session.round(), 2);
		assert_eq!(session.tally().counts(), &btreemap! { job("Medic") => 0 });
	}

	#[test]
	fn station_without_config_ignores_deaths() {
		let mut host = host_with_jobs(&["Security"]);
		host.add_station(OTHER, None);
		let sec = player(&mut host, 100, Some("Security"));
		let mut plugin = tdm(100);

		init(&mut plugin, &mut host, S);
		init(&mut plugin, &mut host, OTHER);
		assert!(plugin.session().is_none());

		die(&mut plugin, &mut host, sec);
		assert!(host.announcements().is_empty());
		assert!(host.ticker_calls().is_empty());
	}

	#[test]
	fn deaths_before_any_station_are_ignored() {
		let mut host = host_with_jobs(&["Security"]);
		let sec = player(&mut host, 100, Some("Security"));
		let mut plugin = tdm(100);
		die(&mut plugin, &mut host, sec);
		assert!(host.announcements().is_empty());
	}

	#[test]
	fn counts_deaths_per_job() {
		let mut host = host_with_jobs(&["Security", "Engineer"]);
		let sec = player(&mut host, 100, Some("Security"));
		let eng = player(&mut host, 101, Some("Engineer"));
		let mut plugin = tdm(100);
		init(&mut plugin, &mut host, S);

		for &e in &[sec, eng, sec] {
			die(&mut plugin, &mut host, e);
		}

		assert_eq!(plugin.session().unwrap().tally().counts(), &btreemap! {
			job("Engineer") => 1,
			job("Security") => 2,
		});
		assert_eq!(host.announcements(), &[
			"Security has lost warrior! 99 to restart!".to_string(),
			"Engineer has lost warrior! 99 to restart!".to_string(),
			"Security has lost warrior! 98 to restart!".to_string(),
		]);
	}

	#[test]
	fn hundredth_death_ends_the_round_once() {
		let mut host = host_with_jobs(&["Security", "Engineer"]);
		let sec = player(&mut host, 100, Some("Security"));
		let mut plugin = tdm(DEFAULT_DEATH_THRESHOLD);
		init(&mut plugin, &mut host, S);

		for n in 1..=99u32 {
			die(&mut plugin, &mut host, sec);
			assert_eq!(
				host.announcements().last().unwrap(),
				&format!("Security has lost warrior! {} to restart!", 100 - n)
			);
		}
		assert!(host.ticker_calls().is_empty());

		die(&mut plugin, &mut host, sec);
		assert_eq!(host.announcements().len(), 100);
		assert_eq!(
			host.announcements().last().unwrap(),
			"Game ended!\n1. Engineer: 0 deaths\n2. Security: 100 deaths"
		);
		assert_eq!(host.ticker_calls(), &[TickerCall::EndRound, TickerCall::RestartRound]);
		assert!(plugin.session().is_none());

		// nothing counts until the restarted round initializes the station again
		die(&mut plugin, &mut host, sec);
		assert_eq!(host.announcements().len(), 100);
		assert_eq!(host.rounds_restarted(), 1);

		init(&mut plugin, &mut host, S);
		die(&mut plugin, &mut host, sec);
		assert_eq!(host.announcements().last().unwrap(), "Security has lost warrior! 99 to restart!");
	}

	#[test]
	fn configured_threshold_ends_the_round() {
		let mut host = host_with_jobs(&["Security", "Engineer", "Medic"]);
		let sec = player(&mut host, 100, Some("Security"));
		let eng = player(&mut host, 101, Some("Engineer"));
		let mut plugin = tdm(2);
		init(&mut plugin, &mut host, S);

		die(&mut plugin, &mut host, eng);
		die(&mut plugin, &mut host, sec);
		die(&mut plugin, &mut host, sec);

		assert_eq!(host.announcements(), &[
			"Engineer has lost warrior! 1 to restart!".to_string(),
			"Security has lost warrior! 1 to restart!".to_string(),
			"Game ended!\n1. Medic: 0 deaths\n2. Engineer: 1 deaths\n3. Security: 2 deaths".to_string(),
		]);
		assert_eq!(host.rounds_restarted(), 1);
	}

	#[test]
	fn untracked_job_is_ignored() {
		let mut host = host_with_jobs(&["Security", "Engineer"]);
		let pilot = player(&mut host, 100, Some("Pilot"));
		let mut plugin = tdm(100);
		init(&mut plugin, &mut host, S);

		die(&mut plugin, &mut host, pilot);
		assert!(host.announcements().is_empty());
		assert_eq!(plugin.session().unwrap().tally().counts(), &btreemap! {
			job("Engineer") => 0,
			job("Security") => 0,
		});
	}

	#[test]
	fn jobless_minds_count_as_none() {
		let mut host = host_with_jobs(&["none", "Security"]);
		let jobless = player(&mut host, 100, None);
		let mut plugin = tdm(100);
		init(&mut plugin, &mut host, S);

		die(&mut plugin, &mut host, jobless);
		assert_eq!(host.announcements(), &["none has lost warrior! 99 to restart!".to_string()]);
	}

	#[test]
	fn only_deaths_of_minds_count() {
		let mut host = host_with_jobs(&["Security"]);
		let sec = player(&mut host, 100, Some("Security"));
		let mut plugin = tdm(100);
		init(&mut plugin, &mut host, S);

		die(&mut plugin, &mut host, EntityUid(555)); // no mind
		for state in [MobState::Alive, MobState::Critical] {
			plugin.event(&mut host, &mut Event::MobStateChanged { entity: sec, new_state: state });
		}
		assert!(host.announcements().is_empty());
		assert_eq!(plugin.session().unwrap().tally().deaths(&job("Security")), Some(0));
	}

	/// Five spawn points, only #13 is a Security spawn on station `S`.
	fn spawn_world(seed: u64) -> SimHost {
		let mut host = seeded_host(seed, &["Security", "Engineer"]);
		host.add_station(OTHER, Some(vec![job("Security")]));
		host.add_spawn_point(EntityUid(10), Some(job("Security")), Some(OTHER), Coordinates::new(0.0, 0.0));
		host.add_spawn_point(EntityUid(11), Some(job("Engineer")), Some(S), Coordinates::new(1.0, 0.0));
		host.add_spawn_point(EntityUid(12), None, Some(S), Coordinates::new(2.0, 0.0));
		host.add_spawn_point(EntityUid(13), Some(job("Security")), Some(S), Coordinates::new(3.0, 7.0));
		host.add_spawn_point(EntityUid(14), Some(job("Security")), None, Coordinates::new(4.0, 0.0));
		host
	}

	fn spawn(plugin: &mut TeamDeathmatch, host: &mut SimHost, ev: PlayerSpawningEvent) -> PlayerSpawningEvent {
		let mut ev = Event::PlayerSpawning(ev);
		plugin.event(host, &mut ev);
		match ev {
			Event::PlayerSpawning(spawning) => spawning,
			other => panic!("event changed kind: {:?}", other),
		}
	}

	#[test]
	fn spawns_on_the_only_matching_point() {
		// different shuffles, same outcome
		for seed in 0..20 {
			let mut host = spawn_world(seed);
			let mut plugin = tdm(100);
			let profile = CharacterProfile { name: "Urist".into() };
			let spawning = spawn(&mut plugin, &mut host,
				PlayerSpawningEvent::new(Some(job("Security")), Some(S), Some(profile.clone())));

			assert!(spawning.handled);
			assert_eq!(host.spawned().len(), 1);
			let record = &host.spawned()[0];
			assert_eq!(record.coordinates, Coordinates::new(3.0, 7.0));
			assert_eq!(record.job, Some(job("Security")));
			assert_eq!(record.profile, Some(profile));
			assert_eq!(record.station, Some(S));
			assert_eq!(spawning.spawn_result, Some(record.entity));
		}
	}

	#[test]
	fn spawns_anywhere_without_job_or_station() {
		let mut seen = BTreeSet::new();
		for seed in 0..50 {
			let mut host = spawn_world(seed);
			let mut plugin = tdm(100);
			let spawning = spawn(&mut plugin, &mut host, PlayerSpawningEvent::new(None, Some(S), None));
			assert!(spawning.handled);
			let x = host.spawned()[0].coordinates.x as u32;
			assert!([1, 2, 3].contains(&x), "spawned off-station at x = {}", x);
			seen.insert(x);
		}
		// the shuffle actually spreads players out
		assert!(seen.len() > 1);

		let mut host = spawn_world(3);
		let mut plugin = tdm(100);
		let spawning = spawn(&mut plugin, &mut host, PlayerSpawningEvent::new(Some(job("Security")), None, None));
		assert!(spawning.handled);
		let x = host.spawned()[0].coordinates.x as u32;
		assert!([0, 3, 4].contains(&x));
	}

	#[test]
	fn unmatched_spawn_stays_unhandled() {
		let mut host = spawn_world(0);
		let mut plugin = tdm(100);
		let spawning = spawn(&mut plugin, &mut host, PlayerSpawningEvent::new(Some(job("Engineer")), Some(OTHER), None));
		assert!(!spawning.handled);
		assert_eq!(spawning.spawn_result, None);
		assert!(host.spawned().is_empty());

		let mut empty = host_with_jobs(&["Security"]);
		let spawning = spawn(&mut plugin, &mut empty, PlayerSpawningEvent::new(None, None, None));
		assert!(!spawning.handled);
	}

	#[test]
	fn handled_spawn_is_left_alone() {
		let mut host = spawn_world(0);
		let mut plugin = tdm(100);
		let mut ev = PlayerSpawningEvent::new(Some(job("Security")), Some(S), None);
		ev.handled = true;
		let spawning = spawn(&mut plugin, &mut host, ev);
		assert!(spawning.handled);
		assert_eq!(spawning.spawn_result, None);
		assert!(host.spawned().is_empty());
	}

	#[test]
	fn ghosts_respawn_immediately() {
		let mut host = host_with_jobs(&["Security"]);
		let mut plugin = tdm(100);

		plugin.event(&mut host, &mut Event::GhostAttempt { mind: None });
		plugin.event(&mut host, &mut Event::GhostAttempt { mind: Some(Mind::default()) });
		assert!(host.ticker_calls().is_empty());

		let mind = Mind { session: Some("alice".into()), current_job: Some(job("Security")) };
		plugin.event(&mut host, &mut Event::GhostAttempt { mind: Some(mind) });
		assert_eq!(host.ticker_calls(), &[TickerCall::Respawn("alice".into())]);
	}

	#[test]
	fn config_defaults_and_validation() {
		let config: Config = serde_yaml::from_str("enabled: false").unwrap();
		assert!(!config.enabled);
		assert_eq!(config.death_threshold, DEFAULT_DEATH_THRESHOLD);

		let config: Config = serde_yaml::from_str("death_threshold: 3").unwrap();
		assert!(config.enabled);
		assert!(TeamDeathmatch::new(config).is_ok());

		let config: Config = serde_yaml::from_str("death_threshold: 0").unwrap();
		assert!(matches!(TeamDeathmatch::new(config), Err(ConfigError::Invalid(_))));
	}
}
