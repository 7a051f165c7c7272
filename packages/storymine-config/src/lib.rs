mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Discovery, DiscoveryEntities, DiscoveryFastTrack, DiscoveryGeneration,
	DiscoveryTitles, LlmProviderConfig, Providers, Service, StoryMapProviderConfig,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	for (label, base) in [
		("storymap", &cfg.providers.storymap.api_base),
		("generator", &cfg.providers.generator.api_base),
	] {
		if base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_base must be non-empty."),
			});
		}
	}

	if cfg.providers.generator.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider generator api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.storymap.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.storymap.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.storymap.preview_chars == 0 {
		return Err(Error::Validation {
			message: "providers.storymap.preview_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.generator.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.generator.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !cfg.providers.generator.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.generator.temperature must be a finite number.".to_string(),
		});
	}
	if !(0.0..=2.0).contains(&cfg.providers.generator.temperature) {
		return Err(Error::Validation {
			message: "providers.generator.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if cfg.discovery.target_count == 0 {
		return Err(Error::Validation {
			message: "discovery.target_count must be greater than zero.".to_string(),
		});
	}
	if cfg.discovery.candidate_multiplier == 0 {
		return Err(Error::Validation {
			message: "discovery.candidate_multiplier must be greater than zero.".to_string(),
		});
	}

	let generation = &cfg.discovery.generation;

	if generation.max_concurrency == 0 {
		return Err(Error::Validation {
			message: "discovery.generation.max_concurrency must be greater than zero.".to_string(),
		});
	}
	if generation.batch_size == 0 {
		return Err(Error::Validation {
			message: "discovery.generation.batch_size must be greater than zero.".to_string(),
		});
	}
	if generation.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "discovery.generation.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.discovery.fast_track.enabled && cfg.discovery.fast_track.min_candidates == 0 {
		return Err(Error::Validation {
			message: "discovery.fast_track.min_candidates must be greater than zero when enabled."
				.to_string(),
		});
	}
	if cfg.discovery.titles.min_chars >= cfg.discovery.titles.max_chars {
		return Err(Error::Validation {
			message: "discovery.titles.min_chars must be less than discovery.titles.max_chars."
				.to_string(),
		});
	}
	if cfg.discovery.entities.max_per_kind == 0 {
		return Err(Error::Validation {
			message: "discovery.entities.max_per_kind must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.providers.storymap.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		cfg.providers.storymap.api_key = None;
	}
}
