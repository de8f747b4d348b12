use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use triage_domain::validation::RejectCode;
use triage_service::{
	AutoFillRequest, Error, SimilarRequest, SuggestOutcome, SuggestRequest,
	UpdateRoutingSettingsRequest,
};
use triage_storage::models::StoredSettings;
use triage_testkit::{MemoryCorpus, MemoryIncident, StubEmbedding, service_with, test_config, unit_at};

const QUERY: &str = "Máy CNC bị lỗi";

struct Fixture {
	embedding: Arc<StubEmbedding>,
	corpus: Arc<MemoryCorpus>,
	equipment: Uuid,
	facilities: Uuid,
}
impl Fixture {
	/// Three equipment incidents at 0.9, 0.85 and 0.6 and one facilities incident at 0.95.
	fn cnc() -> Self {
		let equipment = Uuid::new_v4();
		let facilities = Uuid::new_v4();
		let corpus = MemoryCorpus::new(vec![
			MemoryIncident::resolved("Spindle motor overheating", equipment, "Equipment")
				.with_type("equipment")
				.with_embedding(unit_at(0.9)),
			MemoryIncident::resolved("CNC coolant pump stopped", equipment, "Equipment")
				.with_type("equipment")
				.with_embedding(unit_at(0.85)),
			MemoryIncident::resolved("Lathe chuck jammed again", equipment, "Equipment")
				.with_type("equipment")
				.with_embedding(unit_at(0.6)),
			MemoryIncident::resolved("CNC room lights flickering", facilities, "Facilities")
				.with_embedding(unit_at(0.95)),
		]);
		let embedding = StubEmbedding::new(vec![-1.0, 0.0]).with_vector(QUERY, vec![1.0, 0.0]);

		Self { embedding: Arc::new(embedding), corpus: Arc::new(corpus), equipment, facilities }
	}

	fn backlog(descriptions: &[&str]) -> Self {
		let department = Uuid::new_v4();
		let corpus = MemoryCorpus::new(
			descriptions
				.iter()
				.map(|text| MemoryIncident::resolved(text, department, "Maintenance"))
				.collect(),
		);

		Self {
			embedding: Arc::new(StubEmbedding::new(vec![0.6, 0.8])),
			corpus: Arc::new(corpus),
			equipment: department,
			facilities: Uuid::new_v4(),
		}
	}

	fn service(&self) -> triage_service::TriageService {
		service_with(test_config(), self.embedding.clone(), self.corpus.clone())
	}
}

fn suggest_request(description: &str) -> SuggestRequest {
	SuggestRequest { description: description.to_string(), ..Default::default() }
}

#[tokio::test]
async fn rejected_input_never_reaches_provider_or_index() {
	let fixture = Fixture::cnc();
	let service = fixture.service();

	for (text, code) in [("", RejectCode::Empty), ("short one", RejectCode::TooShort)] {
		let res = service.suggest(suggest_request(text)).await.expect("Suggest failed.");

		assert_eq!(res.outcome, SuggestOutcome::Rejected);
		assert_eq!(res.validation_error.expect("Expected a rejection.").code, code);
		assert!(res.suggestion.is_none());
	}

	assert_eq!(fixture.embedding.calls(), 0);
	assert_eq!(fixture.corpus.queries(), 0);
}

#[tokio::test]
async fn peak_match_department_wins_over_vote_count() {
	let fixture = Fixture::cnc();
	let res = fixture.service().suggest(suggest_request(QUERY)).await.expect("Suggest failed.");
	let suggestion = res.suggestion.expect("Expected a suggestion.");
	let equipment = &res.department_scores[&fixture.equipment.to_string()];

	assert_eq!(res.outcome, SuggestOutcome::Suggested);
	assert_eq!(suggestion.department_id, fixture.facilities.to_string());
	assert_eq!(suggestion.vote_count, 1);
	assert!((suggestion.confidence - 0.95).abs() < 1e-6);
	assert!((equipment.score - (0.9 + 0.85 + 0.6) / 3.0).abs() < 1e-6);
	assert_eq!(equipment.vote_count, 3);
	assert_eq!(res.similar_incidents.len(), 4);
	assert!(res.similar_incidents[0].similarity >= res.similar_incidents[1].similarity);

	let decision = res.auto_assign.expect("Expected an auto-assign decision.");

	assert!(decision.auto_assign);
	assert_eq!(decision.reasons, vec!["All conditions met".to_string()]);
	assert_eq!(fixture.embedding.calls(), 1);
}

#[tokio::test]
async fn sample_gate_keeps_suggestion_but_blocks_auto_assign() {
	let fixture = Fixture::cnc();

	fixture.corpus.set_stored_settings(Some(StoredSettings {
		enabled: None,
		threshold: None,
		min_samples: Some(10),
	}));

	let res = fixture.service().suggest(suggest_request(QUERY)).await.expect("Suggest failed.");
	let suggestion = res.suggestion.expect("Expected a suggestion.");
	let decision = res.auto_assign.expect("Expected an auto-assign decision.");

	assert_eq!(suggestion.department_id, fixture.facilities.to_string());
	assert!((suggestion.confidence - 0.95).abs() < 1e-6);
	assert!(!decision.auto_assign);
	assert_eq!(decision.current_samples, 4);
	assert_eq!(decision.reasons, vec!["Not enough samples (4/10, 6 more needed)".to_string()]);
}

#[tokio::test]
async fn structured_context_reweights_candidates() {
	let fixture = Fixture::cnc();
	let req = SuggestRequest {
		description: QUERY.to_string(),
		incident_type: Some("Equipment".to_string()),
		explain: true,
		..Default::default()
	};
	let res = fixture.service().suggest(req).await.expect("Suggest failed.");
	let suggestion = res.suggestion.expect("Expected a suggestion.");
	let diagnostics = res.diagnostics.expect("Expected diagnostics.");

	assert_eq!(suggestion.department_id, fixture.equipment.to_string());
	assert!((diagnostics.weights.semantic - 0.8).abs() < 1e-9);
	assert!((diagnostics.weights.incident_type - 0.2).abs() < 1e-9);
	assert_eq!(diagnostics.retrieved, 4);
	assert_eq!(diagnostics.after_floor, 4);
}

#[tokio::test]
async fn nothing_above_floor_is_no_match() {
	let fixture = Fixture::cnc();
	let service = fixture.service();
	let res = service
		.suggest(suggest_request("Printer in the office is out of toner"))
		.await
		.expect("Suggest failed.");

	assert_eq!(res.outcome, SuggestOutcome::NoMatch);
	assert!(res.suggestion.is_none());
	assert!(res.auto_assign.is_none());
	assert!(res.department_scores.is_empty());
}

#[tokio::test]
async fn slow_provider_surfaces_timeout() {
	let fixture = Fixture::cnc();

	fixture.embedding.set_delay(Some(Duration::from_millis(1_000)));

	let err = fixture
		.service()
		.suggest(suggest_request(QUERY))
		.await
		.expect_err("Expected a timeout.");

	assert!(matches!(err, Error::Timeout { .. }), "Unexpected error: {err}");
}

#[tokio::test]
async fn provider_failure_propagates() {
	let fixture = Fixture::cnc();

	fixture.embedding.set_failing(true);

	let err = fixture
		.service()
		.suggest(suggest_request(QUERY))
		.await
		.expect_err("Expected a provider error.");

	assert!(matches!(err, Error::Provider { .. }));
}

#[tokio::test]
async fn find_similar_orders_and_limits() {
	let fixture = Fixture::cnc();
	let service = fixture.service();
	let res = service
		.find_similar(SimilarRequest { description: QUERY.to_string(), limit: Some(2) })
		.await
		.expect("Find similar failed.");

	assert_eq!(res.items.len(), 2);
	assert_eq!(res.items[0].department_id, fixture.facilities);
	assert!((res.items[1].similarity - 0.9).abs() < 1e-6);

	let err = service
		.find_similar(SimilarRequest { description: QUERY.to_string(), limit: Some(0) })
		.await
		.expect_err("Expected an invalid limit.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test]
async fn auto_fill_uses_nearest_incident() {
	let fixture = Fixture::cnc();
	let res = fixture
		.service()
		.auto_fill(AutoFillRequest { description: QUERY.to_string() })
		.await
		.expect("Auto fill failed.");

	assert_eq!(res.department_id, Some(fixture.facilities));
	assert_eq!(res.department_name.as_deref(), Some("Facilities"));
	assert!((res.confidence - 0.95).abs() < 1e-6);
	assert!(res.reference_incident_id.is_some());
}

#[tokio::test]
async fn backlog_run_is_idempotent() {
	let fixture = Fixture::backlog(&[
		"Conveyor belt stopped",
		"Hydraulic press leaking oil",
		"Forklift battery not charging",
		"Dust extractor making noise",
		"Air compressor tripped breaker",
	]);
	let service = fixture.service();
	let first = service.process_embedding_backlog(2, None).await.expect("Backlog run failed.");

	assert_eq!(first.processed, 5);
	assert_eq!(first.failed, 0);
	assert_eq!(fixture.embedding.calls(), 3);
	assert_eq!(fixture.corpus.vectorized_count(), 5);
	assert_eq!(fixture.corpus.claimed_count(), 0);

	let second = service.process_embedding_backlog(2, None).await.expect("Backlog run failed.");

	assert_eq!(second.processed, 0);
	assert_eq!(second.failed, 0);
	assert_eq!(fixture.embedding.calls(), 3);
}

#[tokio::test]
async fn backlog_skips_trivial_descriptions_and_honors_cap() {
	let fixture =
		Fixture::backlog(&["Conveyor belt stopped", "abc", "Hydraulic press leaking oil", "  ok   "]);
	let service = fixture.service();
	let capped = service.process_embedding_backlog(10, Some(1)).await.expect("Backlog run failed.");

	assert_eq!(capped.processed, 1);
	assert_eq!(fixture.embedding.texts_seen(), 1);

	let rest = service.process_embedding_backlog(10, None).await.expect("Backlog run failed.");

	assert_eq!(rest.processed, 1);
	assert_eq!(fixture.corpus.vectorized_count(), 2);
}

#[tokio::test]
async fn failed_writes_leave_records_retryable() {
	let fixture = Fixture::backlog(&[
		"Conveyor belt stopped",
		"Hydraulic press leaking oil",
		"Forklift battery not charging",
	]);
	let service = fixture.service();

	fixture.corpus.set_failing_writes(true);

	let failed = service.process_embedding_backlog(2, None).await.expect("Backlog run failed.");

	assert_eq!(failed.processed, 0);
	assert_eq!(failed.failed, 3);
	assert_eq!(fixture.corpus.vectorized_count(), 0);
	assert_eq!(fixture.corpus.claimed_count(), 0);
	assert_eq!(fixture.corpus.releases(), 1);

	fixture.corpus.set_failing_writes(false);

	let retried = service.process_embedding_backlog(2, None).await.expect("Backlog run failed.");

	assert_eq!(retried.processed, 3);
	assert_eq!(retried.failed, 0);
}

#[tokio::test]
async fn failed_embedding_page_does_not_stop_the_run() {
	let fixture = Fixture::backlog(&[
		"Conveyor belt stopped",
		"Hydraulic press leaking oil",
		"Forklift battery not charging",
	]);

	fixture.embedding.set_failing(true);

	let report =
		fixture.service().process_embedding_backlog(2, None).await.expect("Backlog run failed.");

	assert_eq!(report.processed, 0);
	assert_eq!(report.failed, 3);
	assert_eq!(fixture.embedding.calls(), 2);
	assert_eq!(fixture.corpus.claimed_count(), 0);
}

#[tokio::test]
async fn slow_embedding_page_counts_as_failed() {
	let fixture = Fixture::backlog(&["Conveyor belt stopped"]);

	fixture.embedding.set_delay(Some(Duration::from_millis(1_000)));

	let report =
		fixture.service().process_embedding_backlog(5, None).await.expect("Backlog run failed.");

	assert_eq!(report.processed, 0);
	assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn concurrent_backlog_runs_never_share_records() {
	let fixture = Fixture::backlog(&[
		"Conveyor belt stopped",
		"Hydraulic press leaking oil",
		"Forklift battery not charging",
		"Dust extractor making noise",
		"Air compressor tripped breaker",
		"Loading dock door jammed",
		"Paint booth fan vibrating",
		"Boiler pressure dropping",
		"Chiller alarm keeps sounding",
	]);
	let first = fixture.service();
	let second = fixture.service();

	fixture.embedding.set_delay(Some(Duration::from_millis(20)));

	let (a, b) = tokio::join!(
		first.process_embedding_backlog(2, None),
		second.process_embedding_backlog(2, None)
	);
	let a = a.expect("First backlog run failed.");
	let b = b.expect("Second backlog run failed.");

	assert_eq!(a.processed + b.processed, 9);
	assert_eq!(a.failed + b.failed, 0);
	assert!(a.processed > 0 && b.processed > 0);
	assert_eq!(fixture.embedding.texts_seen(), 9);
	assert_eq!(fixture.corpus.vectorized_count(), 9);
	assert_eq!(fixture.corpus.claimed_count(), 0);
}

#[tokio::test]
async fn stalled_claim_surfaces_timeout() {
	let fixture = Fixture::backlog(&["Conveyor belt stopped", "Hydraulic press leaking oil"]);

	fixture.corpus.set_claim_delay(Some(Duration::from_millis(1_000)));

	let err = fixture
		.service()
		.process_embedding_backlog(5, None)
		.await
		.expect_err("Expected the claim to time out.");

	assert!(
		matches!(err, Error::Timeout { ref operation, timeout_ms: 200 } if operation == "backlog claim")
	);
	assert_eq!(fixture.embedding.calls(), 0);
	assert_eq!(fixture.corpus.vectorized_count(), 0);
}

#[tokio::test]
async fn backlog_rejects_out_of_range_batches() {
	let fixture = Fixture::backlog(&["Conveyor belt stopped"]);
	let service = fixture.service();

	for (batch_size, max_records) in [(0, None), (51, None), (5, Some(0))] {
		let err = service
			.process_embedding_backlog(batch_size, max_records)
			.await
			.expect_err("Expected an invalid request.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
	}

	assert_eq!(fixture.corpus.claims(), 0);
}

#[tokio::test]
async fn index_incident_vectorizes_single_record() {
	let fixture = Fixture::backlog(&["Conveyor belt stopped"]);
	let service = fixture.service();
	let department = Uuid::new_v4();
	let incident = MemoryIncident::resolved("Boiler pressure alarm", department, "Utilities");
	let incident_id = incident.id;

	fixture.corpus.insert(incident);

	let res = service.index_incident(incident_id).await.expect("Index failed.");

	assert_eq!(res.department_id, department);
	assert!(!res.replaced);
	assert!(fixture.corpus.incident(incident_id).and_then(|row| row.embedding).is_some());

	let missing = service.index_incident(Uuid::new_v4()).await.expect_err("Expected not found.");

	assert!(matches!(missing, Error::NotFound { .. }));

	let mut unassigned = MemoryIncident::resolved("Water leak in hall", department, "Utilities");

	unassigned.department = None;

	let unassigned_id = unassigned.id;

	fixture.corpus.insert(unassigned);

	let err = service.index_incident(unassigned_id).await.expect_err("Expected a rejection.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test]
async fn settings_round_trip() {
	let fixture = Fixture::cnc();
	let service = fixture.service();
	let initial = service.get_routing_settings().await.expect("Settings read failed.");

	assert!(initial.enabled);
	assert_eq!(initial.threshold, 0.75);
	assert_eq!(initial.current_samples, 4);
	assert_eq!(initial.recommendation, "Auto-assign is active.");

	let updated = service
		.update_routing_settings(UpdateRoutingSettingsRequest {
			enabled: Some(false),
			threshold: Some(0.9),
			min_samples: Some(10),
		})
		.await
		.expect("Settings update failed.");

	assert!(!updated.enabled);
	assert!(!updated.ready);
	assert!(updated.recommendation.contains("6 more"));
	assert_eq!(
		fixture.corpus.stored_settings(),
		Some(StoredSettings { enabled: Some(false), threshold: Some(0.9), min_samples: Some(10) })
	);

	let err = service
		.update_routing_settings(UpdateRoutingSettingsRequest {
			threshold: Some(1.5),
			..Default::default()
		})
		.await
		.expect_err("Expected an invalid threshold.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(service.get_routing_settings().await.expect("Settings read failed.").threshold, 0.9);
}
