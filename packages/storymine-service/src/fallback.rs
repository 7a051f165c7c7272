use std::time::Duration;

use serde::Serialize;

use crate::{
	Providers,
	generation::{self, GenerationFailure},
	models::{Entity, EntityKind, ScoredCandidate, Story},
};
use storymine_config::Config;
use storymine_domain::title::{self, TitlePolicy};

pub const NO_MATCH_MESSAGE: &str = "No matching material was found in the archive for this request. \
Try a broader subject, a different category, or a wider year range.";
const LEAD_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTier {
	Primary,
	EntitySummary,
	Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackState {
	Primary,
	EntitySummary,
	Generic,
	Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackCause {
	NoCandidates,
	Generation { failure: GenerationFailure },
	TitlesRejected { rejected: usize },
	NoEntities,
	EntityLookup { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackTransition {
	pub from: FallbackState,
	pub to: FallbackState,
	pub cause: FallbackCause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackStep {
	Advance { to: FallbackState, cause: FallbackCause },
	Finish { tier: FallbackTier, payload: FallbackPayload, fast_tracked: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackPayload {
	Stories { stories: Vec<Story> },
	EntitySummary(EntitySummary),
	Message { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
	pub headline: String,
	pub summary: String,
	pub candidate_count: usize,
	pub groups: Vec<EntityGroup>,
	pub leads: Vec<EntityLead>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityGroup {
	pub kind: EntityKind,
	/// Most-mentioned first.
	pub names: Vec<EntityMention>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMention {
	pub name: String,
	/// Selected candidates whose title or preview mention the name.
	pub mentions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityLead {
	pub id: String,
	pub title: String,
	pub publication_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackOutcome {
	pub tier: FallbackTier,
	pub payload: FallbackPayload,
	pub fast_tracked: bool,
	/// Every tier change, in order. Empty when the primary tier succeeded.
	pub trace: Vec<FallbackTransition>,
}

/// Drives one request through primary generation, the entity summary and the generic message.
/// Every path ends in `Done` with a payload; provider errors are recorded as causes and never
/// returned.
pub struct FallbackController<'a> {
	cfg: &'a Config,
	providers: &'a Providers,
	candidates: &'a [ScoredCandidate],
	instructions: &'a str,
}
impl<'a> FallbackController<'a> {
	pub fn new(
		cfg: &'a Config,
		providers: &'a Providers,
		candidates: &'a [ScoredCandidate],
		instructions: &'a str,
	) -> Self {
		Self { cfg, providers, candidates, instructions }
	}

	pub async fn run(&self) -> FallbackOutcome {
		let mut state = FallbackState::Primary;
		let mut trace = Vec::new();

		loop {
			match self.step(state).await {
				FallbackStep::Advance { to, cause } => {
					tracing::info!(from = ?state, to = ?to, cause = ?cause, "Fallback transition.");

					trace.push(FallbackTransition { from: state, to, cause });

					state = to;
				},
				FallbackStep::Finish { tier, payload, fast_tracked } => {
					tracing::info!(
						tier = ?tier,
						fast_tracked,
						transitions = trace.len(),
						"Fallback chain finished."
					);

					return FallbackOutcome { tier, payload, fast_tracked, trace };
				},
			}
		}
	}

	/// Evaluates a single state. `Done` is terminal; stepping it yields the generic payload.
	pub async fn step(&self, state: FallbackState) -> FallbackStep {
		match state {
			FallbackState::Primary => self.primary().await,
			FallbackState::EntitySummary => self.entity_summary().await,
			FallbackState::Generic | FallbackState::Done => self.generic(),
		}
	}

	async fn primary(&self) -> FallbackStep {
		if self.candidates.is_empty() {
			return FallbackStep::Advance {
				to: FallbackState::EntitySummary,
				cause: FallbackCause::NoCandidates,
			};
		}
		if let Some(stories) = self.fast_track() {
			return FallbackStep::Finish {
				tier: FallbackTier::Primary,
				payload: FallbackPayload::Stories { stories },
				fast_tracked: true,
			};
		}

		let run = generation::generate_in_batches(
			self.providers.generation.as_ref(),
			&self.cfg.providers.generator,
			&self.cfg.discovery.generation,
			self.candidates,
			self.instructions,
		)
		.await;

		if run.stories.is_empty() {
			let failure =
				run.failures.into_iter().next().unwrap_or(GenerationFailure::EmptyOutput);

			return FallbackStep::Advance {
				to: FallbackState::EntitySummary,
				cause: FallbackCause::Generation { failure },
			};
		}

		let (stories, rejected) = filter_story_titles(run.stories, &self.title_policy());

		if stories.is_empty() {
			return FallbackStep::Advance {
				to: FallbackState::EntitySummary,
				cause: FallbackCause::TitlesRejected { rejected },
			};
		}

		FallbackStep::Finish {
			tier: FallbackTier::Primary,
			payload: FallbackPayload::Stories { stories },
			fast_tracked: false,
		}
	}

	async fn entity_summary(&self) -> FallbackStep {
		if self.candidates.is_empty() {
			return FallbackStep::Advance {
				to: FallbackState::Generic,
				cause: FallbackCause::NoEntities,
			};
		}

		let storymap = &self.cfg.providers.storymap;
		let lookup = self.providers.entities.related_entities(storymap, self.candidates);
		let timeout = Duration::from_millis(storymap.timeout_ms);
		let entities = match tokio::time::timeout(timeout, lookup).await {
			Ok(Ok(entities)) => entities,
			Ok(Err(err)) => {
				return FallbackStep::Advance {
					to: FallbackState::Generic,
					cause: FallbackCause::EntityLookup { message: err.to_string() },
				};
			},
			Err(_) => {
				return FallbackStep::Advance {
					to: FallbackState::Generic,
					cause: FallbackCause::EntityLookup {
						message: format!(
							"Entity lookup timed out after {} ms.",
							storymap.timeout_ms
						),
					},
				};
			},
		};

		match build_entity_summary(
			&entities,
			self.candidates,
			self.cfg.discovery.entities.max_per_kind as usize,
		) {
			Some(summary) => FallbackStep::Finish {
				tier: FallbackTier::EntitySummary,
				payload: FallbackPayload::EntitySummary(summary),
				fast_tracked: false,
			},
			None => FallbackStep::Advance {
				to: FallbackState::Generic,
				cause: FallbackCause::NoEntities,
			},
		}
	}

	fn generic(&self) -> FallbackStep {
		let message = if self.candidates.is_empty() {
			NO_MATCH_MESSAGE.to_string()
		} else {
			format!(
				"Found {} archive records for this request, but no stories could be assembled from them. \
Request more material or narrow the subject to try again.",
				self.candidates.len()
			)
		};

		FallbackStep::Finish {
			tier: FallbackTier::Generic,
			payload: FallbackPayload::Message { message },
			fast_tracked: false,
		}
	}

	/// Stories built straight from high-scoring candidates, when enough of them exist.
	fn fast_track(&self) -> Option<Vec<Story>> {
		let fast_track = &self.cfg.discovery.fast_track;

		if !fast_track.enabled {
			return None;
		}

		let strong: Vec<&ScoredCandidate> = self
			.candidates
			.iter()
			.filter(|candidate| candidate.relevance_score >= fast_track.min_score)
			.collect();

		if strong.len() < fast_track.min_candidates as usize {
			return None;
		}

		tracing::info!(
			strong = strong.len(),
			min_score = fast_track.min_score,
			"Fast-tracking generation."
		);

		Some(
			strong
				.into_iter()
				.map(|candidate| Story {
					title: candidate.candidate.title.clone(),
					summary: candidate.candidate.body_preview.clone(),
					candidate_ids: vec![candidate.candidate.id.clone()],
					documentary_potential: Some(candidate.relevance_score.min(10)),
				})
				.collect(),
		)
	}

	fn title_policy(&self) -> TitlePolicy {
		TitlePolicy::from(&self.cfg.discovery.titles)
	}
}

/// Drops stories whose title fails the title filter and cleans the rest. Returns the kept stories
/// and the number rejected.
pub fn filter_story_titles(stories: Vec<Story>, policy: &TitlePolicy) -> (Vec<Story>, usize) {
	let mut kept = Vec::with_capacity(stories.len());
	let mut rejected = 0;

	for mut story in stories {
		match title::check_title(&story.title, policy) {
			Ok(cleaned) => {
				story.title = cleaned;

				kept.push(story);
			},
			Err(reason) => {
				tracing::debug!(
					title = %story.title,
					reason = reason.as_str(),
					"Dropped generated story title."
				);

				rejected += 1;
			},
		}
	}

	(kept, rejected)
}

/// Groups entities by kind, ranked by how many candidates mention them. Returns `None` when there
/// is nothing to group.
pub fn build_entity_summary(
	entities: &[Entity],
	candidates: &[ScoredCandidate],
	max_per_kind: usize,
) -> Option<EntitySummary> {
	let haystacks: Vec<String> = candidates
		.iter()
		.map(|candidate| {
			format!("{} {}", candidate.candidate.title, candidate.candidate.body_preview)
				.to_lowercase()
		})
		.collect();
	let mut groups = Vec::new();

	for kind in EntityKind::ALL {
		let mut names: Vec<EntityMention> = entities
			.iter()
			.filter(|entity| entity.kind == kind && !entity.name.trim().is_empty())
			.map(|entity| {
				let needle = entity.name.trim().to_lowercase();
				let mentions = haystacks.iter().filter(|text| text.contains(&needle)).count();

				EntityMention { name: entity.name.trim().to_string(), mentions }
			})
			.collect();

		if names.is_empty() {
			continue;
		}

		names.sort_by(|a, b| b.mentions.cmp(&a.mentions));
		names.truncate(max_per_kind.max(1));
		groups.push(EntityGroup { kind, names });
	}

	if groups.is_empty() {
		return None;
	}

	let candidate_count = candidates.len();
	let headline = match groups.first().and_then(|group| group.names.first()) {
		Some(top) => {
			format!("{} and the world around them in {candidate_count} archive records", top.name)
		},
		None => format!("People, organizations and places in {candidate_count} archive records"),
	};
	let summary = groups
		.iter()
		.map(|group| {
			let names: Vec<&str> = group.names.iter().map(|mention| mention.name.as_str()).collect();

			format!("{}: {}.", kind_label(group.kind), names.join(", "))
		})
		.collect::<Vec<_>>()
		.join(" ");
	let leads = candidates
		.iter()
		.take(LEAD_COUNT)
		.map(|candidate| EntityLead {
			id: candidate.candidate.id.clone(),
			title: candidate.candidate.title.clone(),
			publication_year: candidate.candidate.publication_year,
		})
		.collect();

	Some(EntitySummary { headline, summary, candidate_count, groups, leads })
}

fn kind_label(kind: EntityKind) -> &'static str {
	match kind {
		EntityKind::Person => "People",
		EntityKind::Organization => "Organizations",
		EntityKind::Place => "Places",
		EntityKind::Event => "Events",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::Candidate;

	fn scored(id: &str, title: &str, preview: &str) -> ScoredCandidate {
		ScoredCandidate {
			candidate: Candidate {
				id: id.to_string(),
				title: title.to_string(),
				body_preview: preview.to_string(),
				body_length: preview.len() as u32,
				publication_year: 1937,
			},
			relevance_score: 3,
			decade_bucket: 1930,
			retrieval_rank: 0,
		}
	}

	fn entity(name: &str, kind: EntityKind) -> Entity {
		Entity { name: name.to_string(), kind }
	}

	#[test]
	fn entity_summary_ranks_by_mentions_and_caps_each_kind() {
		let candidates = vec![
			scored("1", "Ford Plant Strike Ends", "Workers in Detroit returned as Ford agreed."),
			scored("2", "Union Leaders Meet", "The UAW met in Detroit."),
			scored("3", "Quiet Week", "Nothing of note."),
		];
		let entities = vec![
			entity("Flint", EntityKind::Place),
			entity("Detroit", EntityKind::Place),
			entity("Ford", EntityKind::Organization),
			entity("Walter Reuther", EntityKind::Person),
		];
		let summary =
			build_entity_summary(&entities, &candidates, 1).expect("Expected an entity summary.");

		assert_eq!(summary.candidate_count, 3);
		assert_eq!(summary.groups.len(), 3);
		assert_eq!(summary.groups[0].kind, EntityKind::Person);
		assert_eq!(summary.groups[2].kind, EntityKind::Place);
		assert_eq!(summary.groups[2].names, vec![EntityMention {
			name: "Detroit".to_string(),
			mentions: 2
		}]);
		assert_eq!(summary.leads.len(), 3);
		assert!(summary.summary.contains("Organizations: Ford."));
	}

	#[test]
	fn entity_summary_is_none_without_entities() {
		let candidates = vec![scored("1", "Ford Plant Strike Ends", "")];

		assert!(build_entity_summary(&[], &candidates, 5).is_none());
	}

	#[test]
	fn story_titles_are_filtered_and_cleaned() {
		let stories = vec![
			Story {
				title: "BY F. M. WILLIAMS".to_string(),
				summary: "Byline.".to_string(),
				candidate_ids: Vec::new(),
				documentary_potential: None,
			},
			Story {
				title: "War".to_string(),
				summary: "Short.".to_string(),
				candidate_ids: Vec::new(),
				documentary_potential: None,
			},
		];
		let (kept, rejected) = filter_story_titles(stories, &TitlePolicy::default());

		assert_eq!(rejected, 1);
		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].title, "The Story of War");
	}
}
