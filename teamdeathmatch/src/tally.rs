//! Per-job death counts for one round.

use std::collections::BTreeMap;
use std::fmt::Display;

use itertools::Itertools;
use tdm_host::JobId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeathTally {
	deaths: BTreeMap<JobId, u32>,
}

impl DeathTally {
	/// Every job starts at zero. Jobs listed twice are counted once.
	pub fn new(jobs: impl IntoIterator<Item = JobId>) -> Self {
		Self {
			deaths: jobs.into_iter().map(|job| (job, 0)).collect(),
		}
	}

	pub fn deaths(&self, job: &JobId) -> Option<u32> {
		self.deaths.get(job).copied()
	}

	pub fn counts(&self) -> &BTreeMap<JobId, u32> {
		&self.deaths
	}

	pub fn len(&self) -> usize {
		self.deaths.len()
	}

	pub fn is_empty(&self) -> bool {
		self.deaths.is_empty()
	}

	/// Returns the new count, or `None` if `job` isn't tracked (nothing changes then).
	pub fn record_death(&mut self, job: &JobId) -> Option<u32> {
		let n = self.deaths.get_mut(job)?;
		*n += 1;
		Some(*n)
	}

	/// Fewest deaths first. Jobs with equal counts stay in job id order.
	pub fn ranking(&self) -> Ranking<'_> {
		Ranking(self.deaths.iter()
			.map(|(job, &deaths)| (job, deaths))
			.sorted_by_key(|&(_, deaths)| deaths)
			.collect())
	}
}

#[derive(Debug)]
pub struct Ranking<'a>(Vec<(&'a JobId, u32)>);

impl<'a> Ranking<'a> {
	pub fn entries(&self) -> &[(&'a JobId, u32)] {
		&self.0
	}
}

/// One line per job, `1. Engineer: 3 deaths`, no trailing newline.
impl Display for Ranking<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (i, (job, deaths)) in self.0.iter().enumerate() {
			if i > 0 {
				writeln!(f)?;
			}
			write!(f, "{}. {}: {} deaths", i + 1, job, deaths)?;
		}
		Ok(())
	}
}
