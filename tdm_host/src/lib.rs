#![warn(missing_debug_implementations, rust_2018_idioms)]
/*!
Everything a round rule gets to see of the host game engine.

The host raises [`Event`]s and offers its subsystems through narrow capability
traits ([`ChatManager`], [`GameTicker`], [`StationSpawning`], [`EntityQueries`],
[`RandomSource`]). Rules take a `&mut dyn Host`, which bundles all of them.

# Example
```ignore
let mut host = SimHost::new(42);
host.add_station(StationId(1), Some(vec!["Security".into(), "Engineer".into()]));

rule.event(&mut host, &mut Event::StationInitialized { station: StationId(1) });
for line in host.announcements() {
    println!("{}", line);
}
```
*/

#[macro_use] extern crate log;

pub mod defs;
pub mod error;
pub mod services;
#[cfg(feature = "sim")]
pub mod sim;

pub use defs::{
    CharacterProfile, Coordinates, EntityUid, Event, JobId, Mind, MobState, PlayerSpawningEvent,
    SessionId, SpawnPoint, StationConfig, StationId,
};
pub use error::{HostError, HostResult};
pub use services::{ChatManager, EntityQueries, GameTicker, Host, RandomSource, StationSpawning};
