use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::{
	Error, GenerationProvider, Result,
	models::{CorpusFilter, ScoredCandidate, Story},
};
use storymine_config::{DiscoveryGeneration, LlmProviderConfig};
use storymine_domain::intent::{Intent, Query};

/// Why a generation attempt produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationFailure {
	Error { message: String },
	Timeout { timeout_ms: u64 },
	EmptyOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRun {
	/// Stories from every successful batch, in batch order.
	pub stories: Vec<Story>,
	pub batches: usize,
	pub failures: Vec<GenerationFailure>,
}

/// Generates stories for `candidates` in batches of `batch_size`, with at most
/// `max_concurrency` calls in flight. Each call is bounded by `timeout_ms`; a batch that fails,
/// times out or returns no stories is logged and skipped, never retried. Dropping the returned future drops every
/// outstanding call.
pub async fn generate_in_batches(
	provider: &dyn GenerationProvider,
	cfg: &LlmProviderConfig,
	generation: &DiscoveryGeneration,
	candidates: &[ScoredCandidate],
	instructions: &str,
) -> GenerationRun {
	if candidates.is_empty() {
		return GenerationRun { stories: Vec::new(), batches: 0, failures: Vec::new() };
	}

	let semaphore = Semaphore::new(generation.max_concurrency.max(1) as usize);
	let timeout = Duration::from_millis(generation.timeout_ms);
	let batch_size = generation.batch_size.max(1) as usize;
	let calls = candidates.chunks(batch_size).enumerate().map(|(batch_idx, batch)| {
		let semaphore = &semaphore;

		async move {
			let Ok(_permit) = semaphore.acquire().await else {
				return (
					batch_idx,
					Err(GenerationFailure::Error {
						message: "Generation slots are closed.".to_string(),
					}),
				);
			};
			let result = match tokio::time::timeout(
				timeout,
				provider.generate(cfg, batch, instructions),
			)
			.await
			{
				Ok(Ok(stories)) if stories.is_empty() => Err(GenerationFailure::EmptyOutput),
				Ok(Ok(stories)) => Ok(stories),
				Ok(Err(err)) => Err(GenerationFailure::Error { message: err.to_string() }),
				Err(_) => Err(GenerationFailure::Timeout { timeout_ms: generation.timeout_ms }),
			};

			(batch_idx, result)
		}
	});
	let results = join_all(calls).await;
	let batches = results.len();
	let mut stories = Vec::new();
	let mut failures = Vec::new();

	for (batch_idx, result) in results {
		match result {
			Ok(batch_stories) => {
				tracing::debug!(
					batch = batch_idx,
					stories = batch_stories.len(),
					"Generation batch completed."
				);

				stories.extend(batch_stories);
			},
			Err(failure) => {
				tracing::warn!(batch = batch_idx, failure = ?failure, "Generation batch failed.");

				failures.push(failure);
			},
		}
	}

	GenerationRun { stories, batches, failures }
}

/// Instructions for the generator, shaped by the query intent.
pub fn build_instructions(query: &Query, filter: Option<&CorpusFilter>) -> String {
	let focus = match (query.intent, query.subject.as_deref()) {
		(Intent::Entity, Some(subject)) => format!(
			"Focus on {subject}: who or what it was, and the moments in these records where it shaped events."
		),
		(Intent::Timeline, Some(subject)) => format!(
			"Arrange the stories about {subject} chronologically and show how events unfolded over time."
		),
		(Intent::Relationship, Some(subject)) => format!(
			"Trace the connections involving {subject} and the people, organizations and places around it."
		),
		(Intent::StoryDiscovery, Some(subject)) => format!(
			"Surface untold or overlooked stories about {subject} with strong documentary potential."
		),
		(_, None) if !query.raw_text.trim().is_empty() => format!(
			"Surface stories with strong documentary potential related to: {}",
			query.raw_text.trim()
		),
		_ => "Surface the stories with the strongest documentary potential.".to_string(),
	};
	let scope = match filter {
		Some(filter) => format!(
			" Limit the stories to the {} category between {} and {}.",
			filter.category, filter.start_year, filter.end_year
		),
		None => String::new(),
	};

	format!("{focus}{scope}")
}

pub fn build_generation_messages(candidates: &[ScoredCandidate], instructions: &str) -> Vec<Value> {
	let schema = serde_json::json!({
		"stories": [{
			"title": "string",
			"summary": "string",
			"candidate_ids": ["string"],
			"documentary_potential": "integer 1-10"
		}]
	});
	let schema_text = serde_json::to_string_pretty(&schema)
		.unwrap_or_else(|_| "{\"stories\": [{\"title\": \"string\"}]}".to_string());
	let records: Vec<Value> = candidates
		.iter()
		.map(|candidate| {
			serde_json::json!({
				"id": candidate.candidate.id,
				"title": candidate.candidate.title,
				"year": candidate.candidate.publication_year,
				"preview": candidate.candidate.body_preview,
				"score": candidate.relevance_score,
			})
		})
		.collect();
	let records_text = serde_json::to_string_pretty(&records).unwrap_or_else(|_| "[]".to_string());
	let system_prompt = "You are a documentary researcher reading historical newspaper records. \
Output must be valid JSON only and must match the provided schema exactly. \
Each story must be grounded in the supplied records and cite their ids. \
Write concise, specific titles; never use a newspaper name or byline as a title.";
	let user_prompt = format!(
		"Return JSON matching this exact schema:\n{schema_text}\nInstructions:\n{instructions}\nRecords:\n{records_text}"
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

/// Reads `{"stories": [...]}`. Entries without a title or summary are skipped.
pub fn parse_stories(value: &Value) -> Result<Vec<Story>> {
	let items = value.get("stories").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::Provider { message: "Generator output is missing stories array.".to_string() }
	})?;
	let mut out = Vec::with_capacity(items.len());

	for item in items {
		let title = item.get("title").and_then(|v| v.as_str()).map(str::trim).unwrap_or_default();
		let summary =
			item.get("summary").and_then(|v| v.as_str()).map(str::trim).unwrap_or_default();

		if title.is_empty() || summary.is_empty() {
			continue;
		}

		let candidate_ids = item
			.get("candidate_ids")
			.and_then(|v| v.as_array())
			.map(|ids| {
				ids.iter()
					.filter_map(|id| match id {
						Value::String(text) => Some(text.clone()),
						Value::Number(number) => Some(number.to_string()),
						_ => None,
					})
					.collect()
			})
			.unwrap_or_default();
		let documentary_potential = item
			.get("documentary_potential")
			.and_then(|v| v.as_u64())
			.map(|value| value.min(10) as u32);

		out.push(Story {
			title: title.to_string(),
			summary: summary.to_string(),
			candidate_ids,
			documentary_potential,
		});
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_stories_and_skips_incomplete_entries() {
		let value = serde_json::json!({
			"stories": [
				{ "title": "The Flint Sit-Down", "summary": "Workers occupy the plant.", "candidate_ids": ["c1", 2], "documentary_potential": 14 },
				{ "title": "", "summary": "No title." },
				{ "title": "No summary" }
			]
		});
		let stories = parse_stories(&value).expect("parse failed");

		assert_eq!(stories.len(), 1);
		assert_eq!(stories[0].candidate_ids, vec!["c1".to_string(), "2".to_string()]);
		assert_eq!(stories[0].documentary_potential, Some(10));
	}

	#[test]
	fn missing_stories_array_is_an_error() {
		assert!(parse_stories(&serde_json::json!({ "notes": [] })).is_err());
	}

	#[test]
	fn instructions_follow_intent_and_filter() {
		let query = storymine_domain::intent::classify("timeline of the oil boom");
		let filter =
			CorpusFilter { category: "business".to_string(), start_year: 1900, end_year: 1930 };
		let text = build_instructions(&query, Some(&filter));

		assert!(text.contains("chronologically"));
		assert!(text.contains("the oil boom"));
		assert!(text.contains("business category between 1900 and 1930"));
	}

	#[test]
	fn instructions_for_filter_only_requests_are_generic() {
		let query = storymine_domain::intent::classify("");

		assert_eq!(
			build_instructions(&query, None),
			"Surface the stories with the strongest documentary potential."
		);
	}

	#[test]
	fn messages_embed_records_and_instructions() {
		let messages = build_generation_messages(&[], "Find the strike stories.");

		assert_eq!(messages.len(), 2);
		assert_eq!(messages[0]["role"], "system");
		assert!(
			messages[1]["content"]
				.as_str()
				.map(|content| content.contains("Find the strike stories."))
				.unwrap_or(false)
		);
	}
}
