use std::fmt;

use serde::{Deserialize, Serialize};

use storymine_providers::storymap::{Article, ArticleEntity};

/// A retrieved archive record. Owned by the retrieval provider; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
	pub id: String,
	pub title: String,
	pub body_preview: String,
	pub body_length: u32,
	pub publication_year: i32,
}
impl Candidate {
	/// Converts an archive article, or `None` for advertisements and undated records.
	pub fn from_article(article: Article, preview_chars: usize) -> Option<Self> {
		if article.is_advertisement {
			return None;
		}

		let publication_year = article.publication_year?;
		let body_length = u32::try_from(article.content.chars().count()).unwrap_or(u32::MAX);
		let body_preview = article.content.chars().take(preview_chars).collect();

		Some(Self {
			id: article.id,
			title: article.title,
			body_preview,
			body_length,
			publication_year,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
	#[serde(flatten)]
	pub candidate: Candidate,
	pub relevance_score: u32,
	pub decade_bucket: i32,
	/// Zero-based position in the retrieval page.
	pub retrieval_rank: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
	Person,
	Organization,
	Place,
	Event,
}
impl EntityKind {
	pub const ALL: [Self; 4] = [Self::Person, Self::Organization, Self::Place, Self::Event];

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_lowercase().as_str() {
			"person" | "people" => Some(Self::Person),
			"organization" | "organisation" | "org" | "company" => Some(Self::Organization),
			"place" | "location" | "gpe" => Some(Self::Place),
			"event" => Some(Self::Event),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Person => "person",
			Self::Organization => "organization",
			Self::Place => "place",
			Self::Event => "event",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
	pub name: String,
	pub kind: EntityKind,
}
impl Entity {
	pub fn from_article_entity(entity: ArticleEntity) -> Option<Self> {
		let kind = EntityKind::parse(&entity.entity_type)?;

		Some(Self { name: entity.name, kind })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
	pub title: String,
	pub summary: String,
	#[serde(default)]
	pub candidate_ids: Vec<String>,
	#[serde(default)]
	pub documentary_potential: Option<u32>,
}

/// Category and inclusive year range narrowing a discovery request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFilter {
	pub category: String,
	pub start_year: i32,
	pub end_year: i32,
}

/// Arguments handed to the retrieval provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalQuery {
	pub terms: Vec<String>,
	pub filter: Option<CorpusFilter>,
}

/// One page from the retrieval provider. `rows` counts archive rows consumed, including rows
/// dropped during conversion, so offsets advance through the corpus rather than the survivors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalPage {
	pub candidates: Vec<Candidate>,
	pub rows: u32,
}
impl RetrievalPage {
	pub fn new(candidates: Vec<Candidate>) -> Self {
		let rows = u32::try_from(candidates.len()).unwrap_or(u32::MAX);

		Self { candidates, rows }
	}
}

/// Accumulation session key. Filter requests use `{category}-{start}-{end}`; free-text requests
/// use `query-{normalized text}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FilterKey(String);
impl FilterKey {
	pub fn for_filter(filter: &CorpusFilter) -> Self {
		let category = filter.category.trim().to_lowercase();

		Self(format!("{category}-{}-{}", filter.start_year, filter.end_year))
	}

	pub fn for_query(text: &str) -> Self {
		let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

		Self(format!("query-{normalized}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl fmt::Display for FilterKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
