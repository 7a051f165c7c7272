use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use storymine_config::StoryMapProviderConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
	pub id: String,
	pub title: String,
	pub content: String,
	pub publication_year: Option<i32>,
	pub is_advertisement: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleEntity {
	pub name: String,
	pub entity_type: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiveFilter<'a> {
	pub category: &'a str,
	pub start_year: i32,
	pub end_year: i32,
}

/// Term search over the archive.
pub async fn search(
	cfg: &StoryMapProviderConfig,
	terms: &[String],
	limit: u32,
	offset: u64,
) -> Result<Vec<Article>> {
	let body = serde_json::json!({
		"query": terms.first().cloned().unwrap_or_default(),
		"terms": terms,
		"limit": limit,
		"offset": offset,
	});
	let json = post_json(cfg, "/api/search", &body).await?;

	parse_articles(json)
}

/// Category and year-range listing, optionally narrowed by terms.
pub async fn filter(
	cfg: &StoryMapProviderConfig,
	filter: &ArchiveFilter<'_>,
	terms: &[String],
	limit: u32,
	offset: u64,
) -> Result<Vec<Article>> {
	let page = if limit == 0 { 1 } else { offset / u64::from(limit) + 1 };
	let body = serde_json::json!({
		"categories": [filter.category],
		"date_range": {
			"start": format!("{:04}-01-01", filter.start_year),
			"end": format!("{:04}-12-31", filter.end_year),
		},
		"terms": terms,
		"page": page,
		"limit": limit,
		"offset": offset,
	});
	let json = post_json(cfg, "/api/filter", &body).await?;

	parse_articles(json)
}

pub async fn article_entities(
	cfg: &StoryMapProviderConfig,
	article_id: &str,
) -> Result<Vec<ArticleEntity>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}/api/articles/{}", cfg.api_base.trim_end_matches('/'), article_id);
	let res = client
		.get(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_entities(json)
}

async fn post_json(cfg: &StoryMapProviderConfig, path: &str, body: &Value) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base.trim_end_matches('/'), path);
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(body)
		.send()
		.await?;

	Ok(res.error_for_status()?.json().await?)
}

fn parse_articles(json: Value) -> Result<Vec<Article>> {
	let items = json
		.get("results")
		.or_else(|| json.get("articles"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Archive response is missing results array.".to_string(),
		})?;
	let mut out = Vec::with_capacity(items.len());

	for item in items {
		let Some(id) = item.get("id").and_then(value_as_id) else {
			tracing::warn!("Archive article missing id.");

			continue;
		};
		let title = item.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string();
		let content = item
			.get("content")
			.or_else(|| item.get("body"))
			.and_then(|v| v.as_str())
			.unwrap_or_default()
			.to_string();
		let publication_year = item
			.get("publication_date")
			.or_else(|| item.get("publish_date"))
			.and_then(|v| v.as_str())
			.and_then(parse_year)
			.or_else(|| {
				item.get("year").and_then(|v| v.as_i64()).and_then(|year| i32::try_from(year).ok())
			});
		let is_advertisement =
			item.get("is_advertisement").and_then(|v| v.as_bool()).unwrap_or(false);

		out.push(Article { id, title, content, publication_year, is_advertisement });
	}

	Ok(out)
}

fn parse_entities(json: Value) -> Result<Vec<ArticleEntity>> {
	let Some(items) = json.get("entities") else { return Ok(Vec::new()) };
	let items = items.as_array().ok_or_else(|| Error::InvalidResponse {
		message: "Archive entities field must be an array.".to_string(),
	})?;
	let mut out = Vec::with_capacity(items.len());

	for item in items {
		let name = item.get("name").and_then(|v| v.as_str()).map(str::trim).unwrap_or_default();
		let entity_type = item
			.get("entity_type")
			.or_else(|| item.get("type"))
			.and_then(|v| v.as_str())
			.map(str::trim)
			.unwrap_or_default();

		if name.is_empty() || entity_type.is_empty() {
			continue;
		}

		out.push(ArticleEntity { name: name.to_string(), entity_type: entity_type.to_lowercase() });
	}

	Ok(out)
}

fn value_as_id(value: &Value) -> Option<String> {
	match value {
		Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

fn parse_year(date: &str) -> Option<i32> {
	let digits = date.trim().get(..4)?;

	if !digits.chars().all(|ch| ch.is_ascii_digit()) {
		return None;
	}

	digits.parse().ok()
}
