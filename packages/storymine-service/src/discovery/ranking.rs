mod diversity;
mod score;

pub use diversity::{Selection, select_diverse};
pub use score::{
	MARKER_GROUPS, MarkerGroup, cmp_ranked, decade_bucket, score_candidate, score_candidates,
	tie_key,
};
