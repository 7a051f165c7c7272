pub mod accumulation;
pub mod discovery;
pub mod fallback;
pub mod generation;
pub mod models;

mod error;

pub use discovery::{DiscoverRequest, DiscoverResponse, RejectedTitle};
pub use error::{Error, Result};
pub use fallback::{FallbackOutcome, FallbackPayload, FallbackTier};

use std::{collections::HashSet, future::Future, pin::Pin, sync::Arc};

use futures::future::join_all;

use crate::{
	accumulation::SessionStore,
	models::{Candidate, Entity, FilterKey, RetrievalPage, RetrievalQuery, ScoredCandidate, Story},
};
use storymine_config::{Config, LlmProviderConfig, StoryMapProviderConfig};
use storymine_providers::{
	generator,
	storymap::{self, ArchiveFilter},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reads one page of archive candidates starting at `offset`.
pub trait RetrievalProvider
where
	Self: Send + Sync,
{
	fn retrieve<'a>(
		&'a self,
		cfg: &'a StoryMapProviderConfig,
		query: &'a RetrievalQuery,
		limit: u32,
		offset: u64,
	) -> BoxFuture<'a, Result<RetrievalPage>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		candidates: &'a [ScoredCandidate],
		instructions: &'a str,
	) -> BoxFuture<'a, Result<Vec<Story>>>;
}

pub trait EntityProvider
where
	Self: Send + Sync,
{
	fn related_entities<'a>(
		&'a self,
		cfg: &'a StoryMapProviderConfig,
		candidates: &'a [ScoredCandidate],
	) -> BoxFuture<'a, Result<Vec<Entity>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub retrieval: Arc<dyn RetrievalProvider>,
	pub generation: Arc<dyn GenerationProvider>,
	pub entities: Arc<dyn EntityProvider>,
}
impl Providers {
	pub fn new(
		retrieval: Arc<dyn RetrievalProvider>,
		generation: Arc<dyn GenerationProvider>,
		entities: Arc<dyn EntityProvider>,
	) -> Self {
		Self { retrieval, generation, entities }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { retrieval: provider.clone(), generation: provider.clone(), entities: provider }
	}
}

pub struct StoryMineService {
	pub cfg: Config,
	pub providers: Providers,
	pub sessions: SessionStore,
}
impl StoryMineService {
	pub fn new(cfg: Config) -> Self {
		Self { cfg, providers: Providers::default(), sessions: SessionStore::new() }
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		Self { cfg, providers, sessions: SessionStore::new() }
	}

	/// Shares an existing session store, so several service handles walk the same offsets.
	pub fn with_sessions(cfg: Config, providers: Providers, sessions: SessionStore) -> Self {
		Self { cfg, providers, sessions }
	}

	pub fn reset_session(&self, filter_key: &FilterKey) {
		self.sessions.reset(filter_key);

		tracing::info!(filter_key = %filter_key, "Accumulation session reset.");
	}
}

struct DefaultProviders;
impl RetrievalProvider for DefaultProviders {
	fn retrieve<'a>(
		&'a self,
		cfg: &'a StoryMapProviderConfig,
		query: &'a RetrievalQuery,
		limit: u32,
		offset: u64,
	) -> BoxFuture<'a, Result<RetrievalPage>> {
		Box::pin(retrieve_articles(cfg, query, limit, offset))
	}
}
impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		candidates: &'a [ScoredCandidate],
		instructions: &'a str,
	) -> BoxFuture<'a, Result<Vec<Story>>> {
		Box::pin(async move {
			let messages = generation::build_generation_messages(candidates, instructions);
			let json = generator::complete(cfg, &messages).await?;

			generation::parse_stories(&json)
		})
	}
}
impl EntityProvider for DefaultProviders {
	fn related_entities<'a>(
		&'a self,
		cfg: &'a StoryMapProviderConfig,
		candidates: &'a [ScoredCandidate],
	) -> BoxFuture<'a, Result<Vec<Entity>>> {
		Box::pin(lookup_entities(cfg, candidates))
	}
}

async fn retrieve_articles(
	cfg: &StoryMapProviderConfig,
	query: &RetrievalQuery,
	limit: u32,
	offset: u64,
) -> Result<RetrievalPage> {
	let articles = match query.filter.as_ref() {
		Some(filter) => {
			let archive_filter = ArchiveFilter {
				category: filter.category.as_str(),
				start_year: filter.start_year,
				end_year: filter.end_year,
			};

			storymap::filter(cfg, &archive_filter, &query.terms, limit, offset).await?
		},
		None => storymap::search(cfg, &query.terms, limit, offset).await?,
	};
	let rows = u32::try_from(articles.len()).unwrap_or(u32::MAX);
	let mut candidates = Vec::with_capacity(articles.len());
	let mut skipped = 0_usize;

	for article in articles {
		match Candidate::from_article(article, cfg.preview_chars as usize) {
			Some(candidate) => candidates.push(candidate),
			None => skipped += 1,
		}
	}

	if skipped > 0 {
		tracing::warn!(skipped, rows, "Skipped advertisements or undated archive records.");
	}

	// Longest content first; stable so equal lengths keep archive order.
	candidates.sort_by(|a, b| b.body_length.cmp(&a.body_length));

	Ok(RetrievalPage { candidates, rows })
}

async fn lookup_entities(
	cfg: &StoryMapProviderConfig,
	candidates: &[ScoredCandidate],
) -> Result<Vec<Entity>> {
	if candidates.is_empty() {
		return Ok(Vec::new());
	}

	let lookups = candidates
		.iter()
		.map(|candidate| storymap::article_entities(cfg, candidate.candidate.id.as_str()));
	let results = join_all(lookups).await;
	let mut seen = HashSet::new();
	let mut entities = Vec::new();
	let mut last_err = None;
	let mut succeeded = 0_usize;

	for (candidate, result) in candidates.iter().zip(results) {
		match result {
			Ok(found) => {
				succeeded += 1;

				for entity in found.into_iter().filter_map(Entity::from_article_entity) {
					if seen.insert(entity.name.to_lowercase()) {
						entities.push(entity);
					}
				}
			},
			Err(err) => {
				tracing::warn!(
					candidate_id = %candidate.candidate.id,
					error = %err,
					"Entity lookup failed."
				);

				last_err = Some(err);
			},
		}
	}

	match (succeeded, last_err) {
		(0, Some(err)) => Err(err.into()),
		_ => Ok(entities),
	}
}
