pub mod ranking;

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result, StoryMineService,
	accumulation::AccumulationTracker,
	fallback::{FallbackController, FallbackOutcome},
	generation,
	models::{CorpusFilter, FilterKey, RetrievalQuery, ScoredCandidate},
};
use storymine_domain::{
	expansion,
	intent::{self, Query},
	title::{self, TitlePolicy, TitleRejectReason},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverRequest {
	/// Free text. Optional when a filter is given.
	#[serde(default)]
	pub query: Option<String>,
	#[serde(default)]
	pub filter: Option<CorpusFilter>,
	/// Overrides `discovery.target_count`.
	#[serde(default)]
	pub target_count: Option<u32>,
	/// Restart this request's filter key at offset zero.
	#[serde(default)]
	pub fresh: bool,
	/// Overrides `discovery.seed`.
	#[serde(default)]
	pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverResponse {
	pub query: Query,
	pub terms: Vec<String>,
	pub filter_key: FilterKey,
	/// Archive offset this response was read from.
	pub offset: u64,
	/// Usable candidates on the retrieved page.
	pub retrieved: usize,
	pub selected: Vec<ScoredCandidate>,
	pub rejected_titles: Vec<RejectedTitle>,
	pub outcome: FallbackOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedTitle {
	pub id: String,
	pub title: String,
	pub reason: TitleRejectReason,
}

impl StoryMineService {
	pub async fn discover(&self, req: DiscoverRequest) -> Result<DiscoverResponse> {
		let target = validate_request(&req, self.cfg.discovery.target_count)?;
		let seed = req.seed.or(self.cfg.discovery.seed);
		let raw_query = req.query.as_deref().map(str::trim).unwrap_or_default();
		let query = intent::classify(raw_query);

		tracing::info!(
			intent = query.intent.as_str(),
			subject = query.subject.as_deref().unwrap_or(""),
			"Classified discovery query."
		);

		let terms = expansion::expand_terms(query.search_text());
		let filter_key = match req.filter.as_ref() {
			Some(filter) => FilterKey::for_filter(filter),
			None => FilterKey::for_query(query.search_text()),
		};

		tracing::info!(terms = terms.len(), filter_key = %filter_key, "Expanded search terms.");

		if req.fresh {
			self.reset_session(&filter_key);
		}

		let retrieval_query = RetrievalQuery { terms: terms.clone(), filter: req.filter.clone() };
		let limit = target.saturating_mul(self.cfg.discovery.candidate_multiplier);
		let tracker = AccumulationTracker::new(
			&self.sessions,
			self.providers.retrieval.as_ref(),
			&self.cfg.providers.storymap,
		);
		let page = tracker.retrieve(&filter_key, &retrieval_query, limit).await?;
		let retrieved = page.candidates.len();
		let scored = ranking::score_candidates(page.candidates, &terms, seed);
		let selection = ranking::select_diverse(scored, target as usize, seed);

		tracing::info!(
			retrieved,
			selected = selection.selected.len(),
			buckets = selection.bucket_count,
			quota = selection.bucket_quota,
			backfilled = selection.backfilled,
			"Selected candidates."
		);

		let policy = TitlePolicy::from(&self.cfg.discovery.titles);
		let (selected, rejected_titles) = filter_candidate_titles(selection.selected, &policy);

		if !rejected_titles.is_empty() {
			tracing::info!(
				rejected = rejected_titles.len(),
				kept = selected.len(),
				"Dropped candidates with unusable titles."
			);
		}

		let instructions = generation::build_instructions(&query, req.filter.as_ref());
		let outcome =
			FallbackController::new(&self.cfg, &self.providers, &selected, &instructions).run().await;

		Ok(DiscoverResponse {
			query,
			terms,
			filter_key,
			offset: page.offset,
			retrieved,
			selected,
			rejected_titles,
			outcome,
		})
	}
}

/// Returns the effective target count.
fn validate_request(req: &DiscoverRequest, default_target: u32) -> Result<u32> {
	let has_query = req.query.as_deref().map(|text| !text.trim().is_empty()).unwrap_or(false);

	if !has_query && req.filter.is_none() {
		return Err(Error::InvalidRequest {
			message: "Either query or filter must be provided.".to_string(),
		});
	}
	if let Some(filter) = req.filter.as_ref() {
		if filter.category.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "filter.category must be non-empty.".to_string(),
			});
		}
		if filter.start_year > filter.end_year {
			return Err(Error::InvalidRequest {
				message: "filter.start_year must not be after filter.end_year.".to_string(),
			});
		}
	}

	let target = req.target_count.unwrap_or(default_target);

	if target == 0 {
		return Err(Error::InvalidRequest {
			message: "target_count must be greater than zero.".to_string(),
		});
	}

	Ok(target)
}

/// Applied after selection, so a rejected title shrinks the result instead of being backfilled.
fn filter_candidate_titles(
	selected: Vec<ScoredCandidate>,
	policy: &TitlePolicy,
) -> (Vec<ScoredCandidate>, Vec<RejectedTitle>) {
	let mut kept = Vec::with_capacity(selected.len());
	let mut rejected = Vec::new();

	for mut candidate in selected {
		match title::check_title(&candidate.candidate.title, policy) {
			Ok(cleaned) => {
				candidate.candidate.title = cleaned;

				kept.push(candidate);
			},
			Err(reason) => rejected.push(RejectedTitle {
				id: candidate.candidate.id,
				title: candidate.candidate.title,
				reason,
			}),
		}
	}

	(kept, rejected)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::Candidate;

	fn request(query: Option<&str>, filter: Option<CorpusFilter>) -> DiscoverRequest {
		DiscoverRequest { query: query.map(str::to_string), filter, ..Default::default() }
	}

	fn filter(category: &str, start_year: i32, end_year: i32) -> CorpusFilter {
		CorpusFilter { category: category.to_string(), start_year, end_year }
	}

	#[test]
	fn requires_query_or_filter() {
		assert!(validate_request(&request(None, None), 10).is_err());
		assert!(validate_request(&request(Some("   "), None), 10).is_err());
		assert_eq!(validate_request(&request(Some("oil"), None), 10).expect("valid"), 10);
		assert_eq!(
			validate_request(&request(None, Some(filter("labor", 1930, 1939))), 10)
				.expect("valid"),
			10
		);
	}

	#[test]
	fn rejects_bad_filters_and_zero_targets() {
		assert!(validate_request(&request(None, Some(filter(" ", 1930, 1939))), 10).is_err());
		assert!(validate_request(&request(None, Some(filter("labor", 1940, 1930))), 10).is_err());

		let mut req = request(Some("oil"), None);

		req.target_count = Some(0);

		assert!(validate_request(&req, 10).is_err());

		req.target_count = Some(4);

		assert_eq!(validate_request(&req, 10).expect("valid"), 4);
	}

	#[test]
	fn rejected_titles_shrink_the_selection() {
		let candidate = |id: &str, title: &str| ScoredCandidate {
			candidate: Candidate {
				id: id.to_string(),
				title: title.to_string(),
				body_preview: String::new(),
				body_length: 0,
				publication_year: 1937,
			},
			relevance_score: 1,
			decade_bucket: 1930,
			retrieval_rank: 0,
		};
		let (kept, rejected) = filter_candidate_titles(
			vec![candidate("a", "BY F. M. WILLIAMS"), candidate("b", "War")],
			&TitlePolicy::default(),
		);

		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].candidate.title, "The Story of War");
		assert_eq!(rejected, vec![RejectedTitle {
			id: "a".to_string(),
			title: "BY F. M. WILLIAMS".to_string(),
			reason: TitleRejectReason::Byline,
		}]);
	}
}
