use aoma_core::{RunOrchestrator, RunRepository, RunStatus, StepExecutor, StepId};
use aoma_reasoning::{AnthropicConfig, AnthropicReasoningService};
use aoma_report::MarkdownReportRenderer;
use aoma_state_file::FileRunRepository;
use aoma_steps::steps::{market_size, positioning_messaging};
use aoma_steps::{adas_registry, all_steps, sample_payload};
use aoma_test_utils::assertions::{assert_run_status, assert_step_failed, assert_step_ok, assert_step_skipped};
use aoma_test_utils::fast_retry_policy;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

fn message(payload: &Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-sonnet-4-5",
        "content": [{"type": "text", "text": format!("```json\n{}\n```", payload)}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 100, "output_tokens": 200}
    }))
}

fn step_request(step_id: &str) -> MockBuilder {
    let system = all_steps()
        .into_iter()
        .find(|s| s.id.as_str() == step_id)
        .map(|s| s.prompt_contract.system_prompt)
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-key"))
        .and(body_partial_json(json!({ "system": system })))
}

/// Answer every step with its sample output, except the listed ones
async fn mount_samples(server: &MockServer, except: &[&str]) {
    for step in all_steps() {
        let id = step.id.as_str();
        if except.contains(&id) {
            continue;
        }
        step_request(id)
            .respond_with(message(&sample_payload(id).unwrap()))
            .mount(server)
            .await;
    }
}

fn service(server: &MockServer) -> Arc<AnthropicReasoningService> {
    Arc::new(
        AnthropicReasoningService::new(AnthropicConfig {
            api_key: "test-key".to_string(),
            api_base: server.uri(),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap(),
    )
}

#[tokio::test]
async fn full_pipeline_over_http() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    // The first market size call is rate limited
    step_request(market_size::ID)
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_samples(&server, &[]).await;

    let dir = tempfile::tempdir()?;
    let repository = Arc::new(FileRunRepository::new(dir.path()));
    let renderer = Arc::new(MarkdownReportRenderer::new(dir.path()));
    let orchestrator = RunOrchestrator::new(
        Arc::new(adas_registry()?),
        StepExecutor::new(service(&server)).with_retry_policy(fast_retry_policy(2)),
    )?
    .with_repository(repository.clone())
    .with_renderer(renderer.clone());

    let run = orchestrator.start_run().await?;

    assert_run_status(&run, RunStatus::Succeeded)?;
    assert_step_ok(&run, market_size::ID, 2)?;
    let market = run.completed_steps.get(&StepId::new(market_size::ID)).unwrap();
    assert_eq!(Some(&market.payload), sample_payload(market_size::ID).as_ref());

    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 11);
    assert_eq!(repository.latest().await?.unwrap().run_id, run.run_id);

    let markdown = tokio::fs::read_to_string(renderer.last_written().unwrap()).await?;
    assert!(markdown.contains("| Steps ok | 10 / 10 |"));
    Ok(())
}

#[tokio::test]
async fn rejected_request_fails_the_step_without_retrying() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    step_request(positioning_messaging::ID)
        .respond_with(ResponseTemplate::new(400).set_body_string("prompt too long"))
        .expect(1)
        .mount(&server)
        .await;
    mount_samples(&server, &[positioning_messaging::ID]).await;

    let run = RunOrchestrator::new(
        Arc::new(adas_registry()?),
        StepExecutor::new(service(&server)).with_retry_policy(fast_retry_policy(2)),
    )?
    .start_run()
    .await?;

    assert_run_status(&run, RunStatus::PartiallyFailed)?;
    assert_step_failed(&run, positioning_messaging::ID, None)?;
    let error = run.completed_steps.get(&StepId::new(positioning_messaging::ID)).unwrap().error.unwrap();
    assert!(error.contains("prompt too long"), "{}", error);
    assert_step_skipped(&run, "visualization_reporting")?;
    Ok(())
}
