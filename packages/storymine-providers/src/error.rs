pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	/// Generator content that claims to be JSON but does not parse.
	#[error("Malformed JSON content: {0}")]
	MalformedJson(#[from] serde_json::Error),
	#[error(transparent)]
	HeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	HeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("Invalid provider config: {message}")]
	InvalidConfig { message: String },
	#[error("Unexpected archive or generator response: {message}")]
	InvalidResponse { message: String },
}
