use std::{sync::Arc, time::Duration};

use color_eyre::Result;

use triage_service::{BacklogReport, TriageService};

pub struct WorkerState {
	pub service: Arc<TriageService>,
	pub batch_size: u32,
	pub poll_interval: Duration,
}
impl WorkerState {
	pub fn new(service: Arc<TriageService>) -> Self {
		let batch_size = service.cfg.backlog.batch_size;
		let poll_interval = Duration::from_millis(service.cfg.backlog.poll_interval_ms);

		Self { service, batch_size, poll_interval }
	}
}

/// Runs one backlog pass over every currently unvectorized incident.
pub async fn run_once(state: &WorkerState) -> Result<BacklogReport> {
	Ok(state.service.process_embedding_backlog(state.batch_size, None).await?)
}

/// One polling iteration. Errors are logged and left for the next iteration to retry.
pub async fn tick(state: &WorkerState) -> Option<BacklogReport> {
	match run_once(state).await {
		Ok(report) => {
			if report.processed > 0 || report.failed > 0 {
				tracing::info!(
					processed = report.processed,
					failed = report.failed,
					elapsed_seconds = report.elapsed_seconds,
					records_per_second = report.records_per_second,
					"Embedding backlog processed."
				);
			}

			Some(report)
		},
		Err(err) => {
			tracing::error!(error = %err, "Embedding backlog processing failed.");

			None
		},
	}
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	tracing::info!(
		batch_size = state.batch_size,
		poll_interval_ms = state.poll_interval.as_millis() as u64,
		"Embedding worker started."
	);

	loop {
		tick(&state).await;
		tokio::time::sleep(state.poll_interval).await;
	}
}
