use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	pub discovery: Discovery,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub storymap: StoryMapProviderConfig,
	pub generator: LlmProviderConfig,
}

/// Archive API used for candidate retrieval and entity lookup.
#[derive(Debug, Deserialize)]
pub struct StoryMapProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Optional. Blank values are normalized to `None`.
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Number of leading body characters kept as the candidate preview.
	#[serde(default = "default_preview_chars")]
	pub preview_chars: u32,
}

/// OpenAI-compatible chat completions endpoint used for narrative generation.
#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Discovery {
	pub target_count: u32,
	/// Retrieval pulls `target_count * candidate_multiplier` rows per call.
	pub candidate_multiplier: u32,
	/// Optional. Replaces retrieval-order tie breaking with a keyed hash.
	pub seed: Option<u64>,
	#[serde(default)]
	pub generation: DiscoveryGeneration,
	#[serde(default)]
	pub fast_track: DiscoveryFastTrack,
	#[serde(default)]
	pub titles: DiscoveryTitles,
	#[serde(default)]
	pub entities: DiscoveryEntities,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryGeneration {
	pub max_concurrency: u32,
	pub batch_size: u32,
	pub timeout_ms: u64,
}
impl Default for DiscoveryGeneration {
	fn default() -> Self {
		Self { max_concurrency: 3, batch_size: 6, timeout_ms: 30_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryFastTrack {
	pub enabled: bool,
	pub min_score: u32,
	pub min_candidates: u32,
}
impl Default for DiscoveryFastTrack {
	fn default() -> Self {
		Self { enabled: false, min_score: 8, min_candidates: 5 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryTitles {
	pub max_chars: u32,
	pub min_chars: u32,
}
impl Default for DiscoveryTitles {
	fn default() -> Self {
		Self { max_chars: 100, min_chars: 15 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryEntities {
	pub max_per_kind: u32,
}
impl Default for DiscoveryEntities {
	fn default() -> Self {
		Self { max_per_kind: 5 }
	}
}

fn default_preview_chars() -> u32 {
	1_000
}
