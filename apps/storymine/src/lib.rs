use clap::{
	Parser,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use tracing_subscriber::EnvFilter;

use storymine_service::{DiscoverRequest, StoryMineService, models::CorpusFilter};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
	/// Free-text question, e.g. "who was Henry Ford".
	#[arg(long, short = 'q')]
	pub query: Option<String>,
	/// Archive category; requires `--from` and `--to`.
	#[arg(long, requires = "from")]
	pub category: Option<String>,
	#[arg(long, value_name = "YEAR", requires = "to")]
	pub from: Option<i32>,
	#[arg(long, value_name = "YEAR", requires = "category")]
	pub to: Option<i32>,
	/// Number of candidates to select. Defaults to `discovery.target_count`.
	#[arg(long, short = 'n')]
	pub count: Option<u32>,
	/// Start this query or filter from the beginning of the archive.
	#[arg(long)]
	pub fresh: bool,
	#[arg(long)]
	pub seed: Option<u64>,
}
impl Args {
	pub fn request(&self) -> DiscoverRequest {
		let filter = match (self.category.as_ref(), self.from, self.to) {
			(Some(category), Some(start_year), Some(end_year)) =>
				Some(CorpusFilter { category: category.clone(), start_year, end_year }),
			_ => None,
		};

		DiscoverRequest {
			query: self.query.clone(),
			filter,
			target_count: self.count,
			fresh: self.fresh,
			seed: self.seed,
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = storymine_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let request = args.request();
	let service = StoryMineService::new(config);
	let response = service.discover(request).await?;

	tracing::info!(
		tier = ?response.outcome.tier,
		selected = response.selected.len(),
		filter_key = %response.filter_key,
		"Discovery finished."
	);

	println!("{}", serde_json::to_string_pretty(&response)?);

	Ok(())
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builds_filter_requests() {
		let args = Args::try_parse_from([
			"storymine",
			"-c",
			"storymine.toml",
			"--category",
			"labor",
			"--from",
			"1930",
			"--to",
			"1939",
			"--fresh",
		])
		.expect("Args parse failed.");
		let request = args.request();

		assert_eq!(
			request.filter,
			Some(CorpusFilter { category: "labor".to_string(), start_year: 1930, end_year: 1939 })
		);
		assert!(request.fresh);
		assert!(request.query.is_none());
	}

	#[test]
	fn category_requires_a_year_range() {
		assert!(
			Args::try_parse_from(["storymine", "-c", "x.toml", "--category", "labor"]).is_err()
		);
	}
}
