use std::{
	collections::HashMap,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
	RetrievalProvider, Result,
	models::{Candidate, FilterKey, RetrievalQuery},
};
use storymine_config::StoryMapProviderConfig;

#[derive(Debug, Default)]
struct SessionState {
	last_key: Option<FilterKey>,
	offsets: HashMap<FilterKey, u64>,
}

/// Process-lifetime map of `FilterKey -> offset`. Nothing is persisted; a restart starts every key
/// at zero. Only the active key keeps an entry once another key begins, so the map stays bounded by
/// the number of concurrent requests rather than the number of distinct queries.
///
/// Concurrency contract: reads and writes are individually atomic, but a tracker call reads the
/// offset before retrieval and writes `start + rows` after it. Two concurrent calls for the same
/// key therefore race and the last write wins.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
	inner: Arc<Mutex<SessionState>>,
}
impl SessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the offset to read from. Switching to a key other than the previous one starts that
	/// key at zero and forgets every other key's offset.
	pub fn begin(&self, key: &FilterKey) -> u64 {
		let mut state = self.lock();

		if state.last_key.as_ref() != Some(key) {
			state.offsets.retain(|stored, _| stored == key);
			state.offsets.insert(key.clone(), 0);
			state.last_key = Some(key.clone());
		}

		*state.offsets.entry(key.clone()).or_insert(0)
	}

	/// Records that `rows` rows were consumed starting at `start`.
	pub fn advance(&self, key: &FilterKey, start: u64, rows: u64) -> u64 {
		let mut state = self.lock();
		let next = start.saturating_add(rows);

		state.offsets.insert(key.clone(), next);

		next
	}

	pub fn reset(&self, key: &FilterKey) {
		self.lock().offsets.insert(key.clone(), 0);
	}

	pub fn offset(&self, key: &FilterKey) -> Option<u64> {
		self.lock().offsets.get(key).copied()
	}

	pub fn len(&self) -> usize {
		self.lock().offsets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn lock(&self) -> MutexGuard<'_, SessionState> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatedPage {
	pub candidates: Vec<Candidate>,
	/// Offset this page was read from.
	pub offset: u64,
	pub rows: u32,
	/// Offset the next call with the same key will read from.
	pub next_offset: u64,
}

/// Wraps retrieval so successive calls with one key walk forward through the corpus.
pub struct AccumulationTracker<'a> {
	store: &'a SessionStore,
	retrieval: &'a dyn RetrievalProvider,
	cfg: &'a StoryMapProviderConfig,
}
impl<'a> AccumulationTracker<'a> {
	pub fn new(
		store: &'a SessionStore,
		retrieval: &'a dyn RetrievalProvider,
		cfg: &'a StoryMapProviderConfig,
	) -> Self {
		Self { store, retrieval, cfg }
	}

	/// The offset only moves once retrieval has returned; a failed or dropped call leaves it as
	/// it was.
	pub async fn retrieve(
		&self,
		key: &FilterKey,
		query: &RetrievalQuery,
		requested_count: u32,
	) -> Result<AccumulatedPage> {
		let offset = self.store.begin(key);
		let page = self.retrieval.retrieve(self.cfg, query, requested_count, offset).await?;
		let next_offset = self.store.advance(key, offset, u64::from(page.rows));

		tracing::info!(
			filter_key = %key,
			offset,
			rows = page.rows,
			candidates = page.candidates.len(),
			next_offset,
			"Accumulated retrieval page."
		);

		Ok(AccumulatedPage { candidates: page.candidates, offset, rows: page.rows, next_offset })
	}
}
