use std::collections::BTreeMap;

use crate::{discovery::ranking::score::cmp_ranked, models::ScoredCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
	/// Ordered by score, highest first.
	pub selected: Vec<ScoredCandidate>,
	pub bucket_count: usize,
	/// Per-bucket cap for the quota pass: `ceil(target / bucket_count)`.
	pub bucket_quota: usize,
	/// Items added after the quota pass, regardless of bucket.
	pub backfilled: usize,
}

/// Picks at most `target` candidates spread across decade buckets.
///
/// Each non-empty bucket contributes its best `bucket_quota` candidates. When that overshoots the
/// target, buckets are drained round-robin by in-bucket rank so every bucket keeps its best item
/// while room allows. When it undershoots, the best leftovers fill the gap regardless of bucket.
pub fn select_diverse(
	candidates: Vec<ScoredCandidate>,
	target: usize,
	seed: Option<u64>,
) -> Selection {
	if candidates.is_empty() || target == 0 {
		return Selection { selected: Vec::new(), bucket_count: 0, bucket_quota: 0, backfilled: 0 };
	}

	let mut buckets: BTreeMap<i32, Vec<ScoredCandidate>> = BTreeMap::new();

	for candidate in candidates {
		buckets.entry(candidate.decade_bucket).or_default().push(candidate);
	}

	let bucket_count = buckets.len();
	let bucket_quota = target.div_ceil(bucket_count);
	let mut picked: Vec<(usize, ScoredCandidate)> = Vec::new();
	let mut leftovers: Vec<ScoredCandidate> = Vec::new();

	for (_, mut members) in buckets {
		members.sort_by(|a, b| cmp_ranked(a, b, seed));

		let rest = members.split_off(bucket_quota.min(members.len()));

		picked.extend(members.into_iter().enumerate());
		leftovers.extend(rest);
	}

	let mut backfilled = 0;

	if picked.len() > target {
		picked.sort_by(|(a_pos, a), (b_pos, b)| {
			a_pos.cmp(b_pos).then_with(|| cmp_ranked(a, b, seed))
		});
		picked.truncate(target);
	} else if picked.len() < target {
		leftovers.sort_by(|a, b| cmp_ranked(a, b, seed));

		let missing = target - picked.len();

		for candidate in leftovers.into_iter().take(missing) {
			picked.push((usize::MAX, candidate));
			backfilled += 1;
		}
	}

	let mut selected: Vec<ScoredCandidate> =
		picked.into_iter().map(|(_, candidate)| candidate).collect();

	selected.sort_by(|a, b| cmp_ranked(a, b, seed));

	Selection { selected, bucket_count, bucket_quota, backfilled }
}
