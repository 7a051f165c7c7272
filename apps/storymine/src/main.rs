use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = storymine::Args::parse();

	storymine::run(args).await
}
