use std::collections::HashSet;

/// A domain family: when any trigger occurs in the lower-cased subject, all of its terms join the
/// expansion.
#[derive(Debug)]
pub struct TermFamily {
	pub name: &'static str,
	pub triggers: &'static [&'static str],
	pub terms: &'static [&'static str],
}

/// Declaration order is expansion order.
pub const TERM_FAMILIES: &[TermFamily] = &[
	TermFamily {
		name: "automobile",
		triggers: &["automobile", "automotive", "motor car", "ford", "general motors", "detroit"],
		terms: &[
			"automobile",
			"Ford",
			"General Motors",
			"Chrysler",
			"automotive",
			"assembly line",
			"motor car",
			"Detroit",
		],
	},
	TermFamily {
		name: "oil",
		triggers: &["oil", "petroleum", "gasoline", "refinery"],
		terms: &["oil", "petroleum", "Standard Oil", "refinery", "oil field", "gusher", "crude"],
	},
	TermFamily {
		name: "railroad",
		triggers: &["railroad", "railway", "locomotive", "train"],
		terms: &["railroad", "railway", "locomotive", "train", "depot", "Union Pacific", "rail line"],
	},
	TermFamily {
		name: "roosevelt",
		triggers: &["roosevelt", "roosvelt", "roosavelt", "fdr"],
		terms: &["Roosevelt", "Franklin D. Roosevelt", "FDR", "New Deal", "White House"],
	},
	TermFamily {
		name: "world_war",
		triggers: &["world war", "ww2", "wwii", "pearl harbor"],
		terms: &["war", "World War", "Pearl Harbor", "Allied", "home front"],
	},
	TermFamily {
		name: "labor",
		triggers: &["strike", "union", "labor", "labour", "walkout"],
		terms: &["strike", "labor union", "walkout", "picket line", "workers"],
	},
	TermFamily {
		name: "prohibition_era",
		triggers: &["1920s", "twenties", "prohibition", "bootleg", "speakeasy"],
		terms: &["Prohibition", "speakeasy", "bootlegger", "Roaring Twenties", "jazz age"],
	},
	TermFamily {
		name: "depression_era",
		triggers: &["1929", "1930s", "thirties", "depression", "crash", "crisis"],
		terms: &[
			"Great Depression",
			"stock market crash",
			"bank run",
			"unemployment",
			"breadline",
			"Dust Bowl",
		],
	},
];

/// Expands a subject into search terms: the trimmed subject first, then every triggered family in
/// declaration order. Terms are deduplicated case-insensitively, keeping the first spelling.
pub fn expand_terms(subject: &str) -> Vec<String> {
	let trimmed = subject.trim();

	if trimmed.is_empty() {
		return Vec::new();
	}

	let lowered = trimmed.to_lowercase();
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	push_term(&mut out, &mut seen, trimmed);

	for family in triggered_families(&lowered) {
		for term in family.terms {
			push_term(&mut out, &mut seen, term);
		}
	}

	out
}

/// Families whose triggers occur in `lowered`, in declaration order.
pub fn triggered_families(lowered: &str) -> impl Iterator<Item = &'static TermFamily> + '_ {
	TERM_FAMILIES
		.iter()
		.filter(move |family| family.triggers.iter().any(|trigger| lowered.contains(trigger)))
}

fn push_term(out: &mut Vec<String>, seen: &mut HashSet<String>, value: &str) {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return;
	}
	if seen.insert(trimmed.to_lowercase()) {
		out.push(trimmed.to_string());
	}
}
