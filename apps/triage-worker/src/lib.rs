pub mod worker;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use triage_service::TriageService;
use triage_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = triage_cli::VERSION,
	rename_all = "kebab",
	styles = triage_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Process the backlog once and exit instead of polling.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = triage_config::load(&args.config)?;

	triage_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema(config.storage.vector_dim).await?;

	let state = worker::WorkerState::new(Arc::new(TriageService::new(config, db)));

	match state.service.embedding_stats().await {
		Ok(stats) => tracing::info!(
			total = stats.total,
			with_embedding = stats.with_embedding,
			without_embedding = stats.without_embedding,
			percentage = stats.percentage,
			"Embedding coverage at startup."
		),
		Err(err) => tracing::warn!(error = %err, "Failed to read embedding coverage."),
	}

	if args.once {
		let report = worker::run_once(&state).await?;

		tracing::info!(processed = report.processed, failed = report.failed, "Backlog run complete.");

		return Ok(());
	}

	worker::run_worker(state).await
}
