use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Entity,
	Timeline,
	Relationship,
	StoryDiscovery,
	General,
}
impl Intent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Entity => "entity",
			Self::Timeline => "timeline",
			Self::Relationship => "relationship",
			Self::StoryDiscovery => "story_discovery",
			Self::General => "general",
		}
	}
}

/// A phrasing family. Capture group 1, when present, is the subject.
#[derive(Debug)]
pub struct IntentRule {
	pub intent: Intent,
	pub patterns: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
	pub raw_text: String,
	pub intent: Intent,
	pub subject: Option<String>,
}
impl Query {
	/// Text used to seed term expansion: the subject when one was extracted.
	pub fn search_text(&self) -> &str {
		self.subject.as_deref().unwrap_or_else(|| self.raw_text.trim())
	}
}

/// Evaluated top to bottom; the first rule with a matching pattern wins.
pub const INTENT_RULES: [IntentRule; 4] = [
	IntentRule {
		intent: Intent::Entity,
		patterns: &[
			r"(?i)^(?:who|what)\s+(?:was|were|is|are)\s+(.+)$",
			r"(?i)^tell\s+me\s+(?:more\s+)?about\s+(.+)$",
			r"(?i)^(?:information|info|facts)\s+(?:on|about)\s+(.+)$",
		],
	},
	IntentRule {
		intent: Intent::Timeline,
		patterns: &[
			r"(?i)^(?:what\s+happened|events?)\s+(?:in|during)\s+(.+)$",
			r"(?i)^(?:timeline|chronology|history)\s+of\s+(.+)$",
			r"(?i)^when\s+did\s+(.+?)\s+(?:happen|begin|start|end|occur)$",
		],
	},
	// Two subjects are captured; only the first drives downstream search.
	IntentRule {
		intent: Intent::Relationship,
		patterns: &[
			r"(?i)^how\s+(?:was|were|is|are|did)\s+(.+?)\s+(?:connected|related|linked|tied|relate)\s+(?:to|with)\s+(.+)$",
			r"(?i)^(?:relationship|connection|link)\s+between\s+(.+?)\s+and\s+(.+)$",
		],
	},
	IntentRule {
		intent: Intent::StoryDiscovery,
		patterns: &[
			r"(?i)\b(?:find|discover|show|give|suggest|uncover)\b.*?\b(?:stories|story|documentary|documentaries|narratives?)\b(?:\s+(?:about|on|of|from|in|involving|regarding|concerning|related\s+to|around)\s+(.+))?$",
		],
	},
];

static COMPILED_RULES: LazyLock<Vec<(&'static IntentRule, Vec<Regex>)>> = LazyLock::new(|| {
	INTENT_RULES
		.iter()
		.map(|rule| {
			let patterns =
				rule.patterns.iter().filter_map(|pattern| Regex::new(pattern).ok()).collect();

			(rule, patterns)
		})
		.collect()
});

/// Maps raw query text to an intent and optional subject. Never fails: text no rule matches is
/// `Intent::General` without a subject.
pub fn classify(raw_text: &str) -> Query {
	let normalized = normalize_query_text(raw_text);

	for (rule, patterns) in COMPILED_RULES.iter() {
		for pattern in patterns {
			let Some(captures) = pattern.captures(&normalized) else { continue };
			let subject = captures.get(1).and_then(|value| clean_subject(value.as_str()));

			return Query { raw_text: raw_text.to_string(), intent: rule.intent, subject };
		}
	}

	Query { raw_text: raw_text.to_string(), intent: Intent::General, subject: None }
}

/// Returns every subject a rule captured. Relationship queries yield two; `classify` keeps the
/// first only.
pub fn captured_subjects(raw_text: &str) -> Vec<String> {
	let normalized = normalize_query_text(raw_text);

	for (_, patterns) in COMPILED_RULES.iter() {
		for pattern in patterns {
			let Some(captures) = pattern.captures(&normalized) else { continue };

			return captures
				.iter()
				.skip(1)
				.flatten()
				.filter_map(|value| clean_subject(value.as_str()))
				.collect();
		}
	}

	Vec::new()
}

fn normalize_query_text(raw_text: &str) -> String {
	let collapsed = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");

	collapsed.trim_end_matches(['?', '.', '!']).trim().to_string()
}

fn clean_subject(value: &str) -> Option<String> {
	let trimmed = value.trim().trim_matches(|ch: char| matches!(ch, '"' | '\'' | ',' | ';'));
	let trimmed = trimmed.trim();

	if trimmed.is_empty() {
		return None;
	}

	Some(trimmed.to_string())
}
