use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use storymine_config::DiscoveryTitles;

/// Newspaper mastheads and wire-service credits that mark a scanned header rather than a headline.
pub const MASTHEAD_TOKENS: &[&str] = &[
	"DAILY NEWS",
	"GAZETTE",
	"TRIBUNE",
	"HERALD",
	"CHRONICLE",
	"COURIER",
	"EVENING STAR",
	"MORNING STAR",
	"ASSOCIATED PRESS",
	"UNITED PRESS",
	"(AP)",
	"(UP)",
	"SUNDAY EDITION",
	"CONTINUED ON PAGE",
];

/// Matched against the upper-cased title.
pub const BYLINE_PREFIXES: &[&str] = &["BY ", "FROM "];

pub const CREDENTIAL_SUFFIXES: &[&str] = &[", M. D.", ", M.D.", ", DR.", ", PH. D.", ", PH.D."];

/// Glyphs and misread words typical of OCR failures. Word tokens are matched with padding.
pub const OCR_CORRUPTION_TOKENS: &[&str] =
	&["\u{25A0}", "\u{25A1}", "\u{FFFD}", "|||", "~~", "^^", " tbe ", " tlie ", " aud ", " wns "];

static LABEL_PREFIX: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z]+:\s*").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleRejectReason {
	Empty,
	TooLong,
	Masthead,
	Byline,
	Credential,
	OcrCorruption,
}
impl TitleRejectReason {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Empty => "empty",
			Self::TooLong => "too_long",
			Self::Masthead => "masthead",
			Self::Byline => "byline",
			Self::Credential => "credential",
			Self::OcrCorruption => "ocr_corruption",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitlePolicy {
	pub max_chars: usize,
	pub min_chars: usize,
}
impl Default for TitlePolicy {
	fn default() -> Self {
		Self { max_chars: 100, min_chars: 15 }
	}
}
impl From<&DiscoveryTitles> for TitlePolicy {
	fn from(cfg: &DiscoveryTitles) -> Self {
		Self { max_chars: cfg.max_chars as usize, min_chars: cfg.min_chars as usize }
	}
}

/// Validates a raw title and returns the cleaned form, or the first rule it breaks.
pub fn check_title(raw: &str, policy: &TitlePolicy) -> Result<String, TitleRejectReason> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return Err(TitleRejectReason::Empty);
	}
	if trimmed.chars().count() > policy.max_chars {
		return Err(TitleRejectReason::TooLong);
	}

	let upper = trimmed.to_uppercase();

	if MASTHEAD_TOKENS.iter().any(|token| upper.contains(token)) {
		return Err(TitleRejectReason::Masthead);
	}
	if BYLINE_PREFIXES.iter().any(|prefix| upper.starts_with(prefix)) {
		return Err(TitleRejectReason::Byline);
	}
	if CREDENTIAL_SUFFIXES.iter().any(|suffix| upper.contains(suffix)) {
		return Err(TitleRejectReason::Credential);
	}
	if contains_ocr_corruption(trimmed) {
		return Err(TitleRejectReason::OcrCorruption);
	}

	let unlabeled = match LABEL_PREFIX.as_ref() {
		Some(re) => re.replace(trimmed, "").trim().to_string(),
		None => trimmed.to_string(),
	};

	if unlabeled.is_empty() {
		return Err(TitleRejectReason::Empty);
	}
	if unlabeled.chars().count() < policy.min_chars {
		return Ok(format!("The Story of {unlabeled}"));
	}

	Ok(unlabeled)
}

/// `check_title` without the reason.
pub fn clean_title(raw: &str, policy: &TitlePolicy) -> Option<String> {
	check_title(raw, policy).ok()
}

fn contains_ocr_corruption(title: &str) -> bool {
	let padded = format!(" {} ", title.to_lowercase());

	OCR_CORRUPTION_TOKENS.iter().any(|token| padded.contains(token))
}
