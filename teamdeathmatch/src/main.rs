#![allow(clippy::new_without_default)]

#[allow(unused_imports)] // we use maplit in tests
#[macro_use] extern crate maplit;
#[macro_use] extern crate log;

use anyhow::Context;
use dotenv::dotenv;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::env::var;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tdm_host::sim::{Scenario, SimHost};
use tdm_host::{Event, Host};
use thiserror::Error;

use crate::teamdeathmatch::TeamDeathmatch;

mod logging;
pub mod tally;
pub mod teamdeathmatch;

lazy_static::lazy_static! {
    static ref UPTIME: Instant = Instant::now();
}

fn get_scenario_path() -> PathBuf {
    var("TDM_SCENARIO").unwrap_or_else(|_| "scenarios/demo.yaml".into()).into()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to deserialize config.")]
    Serde(#[from] serde_yaml::Error),
    #[error("Failed to open config file")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    info!("Loading {}", path.as_ref().to_string_lossy());
    let mut file = File::open(path)?;
    let mut s = String::new();
    file.read_to_string(&mut s)?;
    let t: T = serde_yaml::from_str(&s)?;
    Ok(t)
}

/// This is the trait you want to implement when you're writing a new round rule.
///
/// Handlers run on the host's dispatch loop, one event at a time, and must not block.
/// Remember to do something like `fn enabled(&self) -> bool { self.config.enabled }`
/// (you have to provide the config).
pub trait Plugin: 'static {
    const NAME: &'static str;
    fn enabled(&self) -> bool { true }

    /// Called once before the first event.
    fn start(&mut self, _host: &mut dyn Host) { }

    /// `ev` is mutable so that claimable events (player spawning) can be marked as handled.
    fn event(&mut self, _host: &mut dyn Host, _ev: &mut Event) {
        // do nothing unless overridden.
    }
}

/// Just a helper trait to avoid trait object and associated constants clashing.
trait Plugin2 {
    fn name(&self) -> &'static str;
    fn enabled(&self) -> bool;
    fn start(&mut self, host: &mut dyn Host);
    fn event(&mut self, host: &mut dyn Host, ev: &mut Event);
}

impl<T: Plugin> Plugin2 for T {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn enabled(&self) -> bool {
        Plugin::enabled(self)
    }

    fn start(&mut self, host: &mut dyn Host) {
        Plugin::start(self, host)
    }

    fn event(&mut self, host: &mut dyn Host, ev: &mut Event) {
        Plugin::event(self, host, ev)
    }
}

pub struct App {
    plugins: BTreeMap<String, Box<dyn Plugin2>>,
}

impl App {
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new()
        }
    }

    fn has_plugin<P: Plugin, C: DeserializeOwned>(&mut self, f: impl FnOnce(C) -> Result<P, ConfigError>) -> Result<(), ConfigError> {
        let config: C = load_config(&format!("configs/{}.yaml", P::NAME))?;
        self.has_plugin_noconfig(f(config)?);
        Ok(())
    }

    fn has_plugin_noconfig<P: Plugin>(&mut self, p: P) {
        let exists = self.plugins.insert(P::NAME.to_string(), Box::new(p));
        if exists.is_some() {
            panic!("Double-loading of plugins is forbidden. Plugin: {}", P::NAME);
        }
    }

    /// Calls `start` on every enabled plugin.
    pub fn start(&mut self, host: &mut dyn Host) {
        for p in self.plugins.values_mut() {
            info!("Plugin {} is {}.", p.name(), if p.enabled() { "enabled" } else { "disabled" });
            if p.enabled() {
                p.start(host);
            }
        }
    }

    /// Hands one event to every enabled plugin, in name order, and gives it back afterwards.
    pub fn dispatch(&mut self, host: &mut dyn Host, mut ev: Event) -> Event {
        for p in self.plugins.values_mut().filter(|p| p.enabled()) {
            trace!("[{}] <- {:?}", p.name(), ev);
            p.event(host, &mut ev);
        }

        if let Event::PlayerSpawning(spawning) = &ev {
            if !spawning.handled {
                debug!("No plugin claimed {:?}, the host spawns the player the default way.", spawning);
            }
        }
        ev
    }

    /// Starts the plugins and dispatches `events` until the stream ends.
    /// Each event is fully handled before the next one is taken.
    /// Returns the number of events dispatched.
    pub async fn run(&mut self, host: &mut dyn Host, events: impl Stream<Item = Event>) -> usize {
        self.start(host);

        futures::pin_mut!(events);
        let mut n = 0;
        while let Some(ev) = events.next().await {
            self.dispatch(host, ev);
            n += 1;
        }
        n
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok(); // load (additional) environment variables from `.env` file in working directory.
    logging::init_logging().context("Failed to start logging")?;
    info!("This is teamdeathmatch {}", env!("CARGO_PKG_VERSION"));
    let _ = UPTIME.elapsed(); // get it, so that it initializes with `Instant::now()`.

    let scenario_path = get_scenario_path();
    let scenario = Scenario::load(&scenario_path)
        .with_context(|| format!("Failed to load scenario {}", scenario_path.display()))?;
    let mut host = SimHost::from_scenario(&scenario)?;

    let mut app = App::new();
    app.has_plugin(TeamDeathmatch::new)?;

    let n = app.run(&mut host, tokio_stream::iter(scenario.events)).await;
    info!("Replayed {} events in {:?}: {} announcements, {} players spawned, {} round restarts.",
        n,
        UPTIME.elapsed(),
        host.announcements().len(),
        host.spawned().len(),
        host.rounds_restarted(),
    );

    Ok(())
}
