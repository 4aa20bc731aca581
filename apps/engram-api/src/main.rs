use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = engram_api::Args::parse();

	engram_api::run(args).await
}
