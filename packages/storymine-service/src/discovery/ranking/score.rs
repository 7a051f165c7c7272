use std::cmp::Ordering;

use crate::models::{Candidate, ScoredCandidate};

/// Words whose presence in a body suggests documentary potential. Each group scores at most once.
#[derive(Debug)]
pub struct MarkerGroup {
	pub name: &'static str,
	pub words: &'static [&'static str],
}

pub const MARKER_GROUPS: [MarkerGroup; 6] = [
	MarkerGroup { name: "historic_significance", words: &["first", "last", "historic"] },
	MarkerGroup { name: "revelation", words: &["secret", "revealed", "exclusive"] },
	MarkerGroup { name: "dramatic_stakes", words: &["crisis", "tragedy", "triumph"] },
	MarkerGroup { name: "human_interest", words: &["family", "personal", "intimate"] },
	MarkerGroup { name: "primary_source", words: &["letter", "diary", "interview"] },
	MarkerGroup { name: "visual", words: &["photo", "picture", "witness"] },
];

const TITLE_MATCH_POINTS: u32 = 3;
const BODY_MATCH_POINTS: u32 = 2;
const BASELINE_MATCH_POINTS: u32 = 1;
const SUBSTANTIAL_BODY_CHARS: u32 = 500;
const LONG_BODY_CHARS: u32 = 1_000;

pub fn decade_bucket(year: i32) -> i32 {
	year.div_euclid(10) * 10
}

/// Scores one candidate. `lowered_terms` must already be lower-cased.
pub fn score_candidate(candidate: &Candidate, lowered_terms: &[String]) -> u32 {
	let title = candidate.title.to_lowercase();
	let body = candidate.body_preview.to_lowercase();
	let in_title = lowered_terms.iter().any(|term| title.contains(term.as_str()));
	let in_body = lowered_terms.iter().any(|term| body.contains(term.as_str()));
	let mut score = if in_title {
		TITLE_MATCH_POINTS
	} else if in_body && candidate.body_length > SUBSTANTIAL_BODY_CHARS {
		BODY_MATCH_POINTS
	} else if in_body {
		BASELINE_MATCH_POINTS
	} else {
		0
	};

	if candidate.body_length > LONG_BODY_CHARS {
		score += 2;
	} else if candidate.body_length > SUBSTANTIAL_BODY_CHARS {
		score += 1;
	}

	for group in &MARKER_GROUPS {
		if group.words.iter().any(|word| body.contains(word)) {
			score += 1;
		}
	}

	score
}

/// Scores candidates and orders them by score, highest first. Ties keep retrieval order unless a
/// seed is supplied, in which case they follow the seeded `tie_key`.
pub fn score_candidates(
	candidates: Vec<Candidate>,
	terms: &[String],
	seed: Option<u64>,
) -> Vec<ScoredCandidate> {
	let lowered_terms: Vec<String> = terms
		.iter()
		.map(|term| term.trim().to_lowercase())
		.filter(|term| !term.is_empty())
		.collect();
	let mut scored: Vec<ScoredCandidate> = candidates
		.into_iter()
		.enumerate()
		.map(|(idx, candidate)| {
			let relevance_score = score_candidate(&candidate, &lowered_terms);
			let decade_bucket = decade_bucket(candidate.publication_year);

			ScoredCandidate {
				candidate,
				relevance_score,
				decade_bucket,
				retrieval_rank: u32::try_from(idx).unwrap_or(u32::MAX),
			}
		})
		.collect();

	scored.sort_by(|a, b| cmp_ranked(a, b, seed));

	scored
}

/// Score descending, then the seeded tie key when present, then retrieval order.
pub fn cmp_ranked(a: &ScoredCandidate, b: &ScoredCandidate, seed: Option<u64>) -> Ordering {
	let ord = b.relevance_score.cmp(&a.relevance_score);

	if ord != Ordering::Equal {
		return ord;
	}

	if let Some(seed) = seed {
		let ord = tie_key(seed, &a.candidate.id).cmp(&tie_key(seed, &b.candidate.id));

		if ord != Ordering::Equal {
			return ord;
		}
	}

	a.retrieval_rank.cmp(&b.retrieval_rank)
}

/// Deterministic pseudo-random key for a candidate under `seed`.
pub fn tie_key(seed: u64, id: &str) -> u64 {
	let mut hasher = blake3::Hasher::new();

	hasher.update(&seed.to_le_bytes());
	hasher.update(id.as_bytes());

	let hash = hasher.finalize();
	let mut bytes = [0_u8; 8];

	bytes.copy_from_slice(&hash.as_bytes()[..8]);

	u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidate(id: &str, title: &str, body: &str, body_length: u32, year: i32) -> Candidate {
		Candidate {
			id: id.to_string(),
			title: title.to_string(),
			body_preview: body.to_string(),
			body_length,
			publication_year: year,
		}
	}

	fn terms(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_lowercase()).collect()
	}

	#[test]
	fn title_match_with_long_body_and_one_marker() {
		let c = candidate(
			"c1",
			"Ford Plant Strike Ends",
			"Workers returned after the crisis at the plant.",
			1_200,
			1937,
		);

		assert_eq!(score_candidate(&c, &terms(&["automobile", "Ford", "General Motors"])), 6);
	}

	#[test]
	fn body_match_requires_substantial_length() {
		let long = candidate("c1", "Plant News", "The ford crossing flooded.", 600, 1937);
		let short = candidate("c2", "Plant News", "The ford crossing flooded.", 200, 1937);

		// Body match (+2) plus the >500 length bonus (+1).
		assert_eq!(score_candidate(&long, &terms(&["ford"])), 3);
		// Baseline match only.
		assert_eq!(score_candidate(&short, &terms(&["ford"])), 1);
	}

	#[test]
	fn unmatched_candidates_score_on_length_and_markers_only() {
		let c = candidate(
			"c1",
			"Weather",
			"A secret diary and a family photo of the first tragedy.",
			1_500,
			1937,
		);

		// Length (+2) and all six marker groups.
		assert_eq!(score_candidate(&c, &terms(&["oil"])), 8);
	}

	#[test]
	fn marker_groups_score_once_each() {
		let c = candidate("c1", "Weather", "crisis crisis tragedy triumph", 100, 1937);

		assert_eq!(score_candidate(&c, &[]), 1);
	}

	#[test]
	fn decade_buckets_floor_to_ten() {
		assert_eq!(decade_bucket(1941), 1940);
		assert_eq!(decade_bucket(1950), 1950);
		assert_eq!(decade_bucket(1899), 1890);
	}

	#[test]
	fn ties_keep_retrieval_order() {
		let scored = score_candidates(
			vec![
				candidate("a", "x", "", 10, 1930),
				candidate("b", "x", "", 10, 1930),
				candidate("c", "oil", "", 10, 1930),
			],
			&["oil".to_string()],
			None,
		);
		let ids: Vec<&str> = scored.iter().map(|c| c.candidate.id.as_str()).collect();

		assert_eq!(ids, vec!["c", "a", "b"]);
		assert_eq!(scored[1].retrieval_rank, 0);
	}

	#[test]
	fn seeded_ties_are_deterministic() {
		let input: Vec<Candidate> =
			(0..8).map(|idx| candidate(&format!("id-{idx}"), "x", "", 10, 1930)).collect();
		let first = score_candidates(input.clone(), &[], Some(7));
		let second = score_candidates(input, &[], Some(7));

		assert_eq!(first, second);
		assert_eq!(tie_key(7, "id-1"), tie_key(7, "id-1"));
		assert_ne!(tie_key(7, "id-1"), tie_key(8, "id-1"));
	}
}
