//! End-to-end runs of the pipeline executor against a scripted provider.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use pipeline::{Backoff, PipelineConfig, PipelineInput, ProviderError, Stage};
use stages::{CancellationToken, PipelineExecutor, SECTION_SEPARATOR};

use support::{
    draft_json, input, research_json, seo_json, smoke_outline_json, valid_outline_json,
    voice_tone_json, Reply, ScriptedProvider, VALID_SECTIONS,
};

fn executor(provider: &Arc<ScriptedProvider>) -> PipelineExecutor {
    executor_with(provider, PipelineConfig::default())
}

fn executor_with(provider: &Arc<ScriptedProvider>, config: PipelineConfig) -> PipelineExecutor {
    PipelineExecutor::new(provider.clone(), config).unwrap()
}

fn drafts(contents: &[&str]) -> Vec<Reply> {
    VALID_SECTIONS
        .iter()
        .zip(contents)
        .map(|((key, _, _), content)| Reply::Text(draft_json(key, content)))
        .collect()
}

fn server_error() -> Reply {
    Reply::Fail(ProviderError::Api {
        status: 500,
        message: "overloaded".to_string(),
    })
}

#[tokio::test]
async fn test_happy_path_produces_every_artefact() {
    let provider = Arc::new(ScriptedProvider::happy().then(
        Stage::DraftSection,
        drafts(&["Intro text.", "Problem text.", "Solution text.", "Wrap up.", "Sign up today."]),
    ));

    let result = executor(&provider).run(&input()).await;

    assert!(result.success, "unexpected error: {:?}", result.error);
    assert!(result.error.is_none());
    assert_eq!(result.retry_count, 0);
    assert!(result.research.is_some());
    assert_eq!(result.outline.as_ref().unwrap().sections.len(), 5);
    assert_eq!(result.outline.as_ref().unwrap().total_estimated_words, 1000);

    let sections = result.sections.as_ref().unwrap();
    let keys: Vec<_> = sections.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, ["intro", "problem", "solution", "conclusion", "cta"]);
    assert_eq!(
        result.full_draft.as_deref(),
        Some("Intro text.\n\nProblem text.\n\nSolution text.\n\nWrap up.\n\nSign up today.")
    );

    let gates = result.quality_gates.as_ref().unwrap();
    assert!(gates.outline.passed);
    assert!(gates.completeness.passed);
    assert_eq!(gates.completeness.reason.as_deref(), Some("5/5 sections completed"));
    assert!(gates.seo.as_ref().unwrap().passed);
    assert!(gates.voice_tone.as_ref().unwrap().passed);
    assert!(gates.all_passed());
    assert!(result.completed_at >= result.started_at);

    assert_eq!(
        provider.stages_called(),
        [
            Stage::Research,
            Stage::Outline,
            Stage::DraftSection,
            Stage::DraftSection,
            Stage::DraftSection,
            Stage::DraftSection,
            Stage::DraftSection,
            Stage::Seo,
            Stage::VoiceTone,
        ]
    );
}

#[tokio::test]
async fn test_requests_carry_stage_temperatures() {
    let provider = Arc::new(ScriptedProvider::happy());
    let config = PipelineConfig::default();
    let expected_seo = config.temperatures.for_stage(Stage::Seo);

    let result = executor_with(&provider, config).run(&input()).await;
    assert!(result.success);

    let seo_calls = provider.calls_for(Stage::Seo);
    assert_eq!(seo_calls.len(), 1);
    assert_eq!(seo_calls[0].temperature, expected_seo);
    assert!(seo_calls[0].system_instruction.is_some());
}

#[tokio::test]
async fn test_outline_retry_is_bounded() {
    let provider = Arc::new(
        ScriptedProvider::happy().always(Stage::Outline, Reply::Text(smoke_outline_json())),
    );

    let result = executor(&provider).run(&input()).await;

    assert!(!result.success);
    assert_eq!(result.retry_count, 3);
    assert_eq!(
        result.error.as_deref(),
        Some("Outline quality gate failed after max retries")
    );
    assert_eq!(provider.calls_for(Stage::Outline).len(), 3);
    assert!(provider.calls_for(Stage::DraftSection).is_empty());
    assert!(result.outline.is_none());
    assert!(result.full_draft.is_none());
}

#[tokio::test]
async fn test_outline_attempts_follow_config() {
    let provider = Arc::new(
        ScriptedProvider::happy().always(Stage::Outline, Reply::Text(smoke_outline_json())),
    );
    let mut config = PipelineConfig::default();
    config.policy.max_outline_attempts = 1;

    let result = executor_with(&provider, config).run(&input()).await;

    assert!(!result.success);
    assert_eq!(result.retry_count, 1);
    assert_eq!(provider.calls_for(Stage::Outline).len(), 1);
}

#[tokio::test]
async fn test_outline_succeeds_after_one_invalid_attempt() {
    let provider = Arc::new(
        ScriptedProvider::happy().then(Stage::Outline, [Reply::Text(smoke_outline_json())]),
    );

    let result = executor(&provider).run(&input()).await;

    assert!(result.success);
    assert_eq!(result.retry_count, 1);
    assert_eq!(provider.calls_for(Stage::Outline).len(), 2);
}

#[tokio::test]
async fn test_outline_call_failures_count_as_attempts() {
    let provider = Arc::new(ScriptedProvider::happy().then(
        Stage::Outline,
        [server_error(), Reply::Text("not json at all".to_string())],
    ));

    let result = executor(&provider).run(&input()).await;

    assert!(result.success);
    assert_eq!(result.retry_count, 2);
    assert_eq!(provider.calls_for(Stage::Outline).len(), 3);
}

#[tokio::test]
async fn test_outline_retries_reuse_the_same_prompt() {
    let provider = Arc::new(
        ScriptedProvider::happy().then(Stage::Outline, [Reply::Text(smoke_outline_json())]),
    );

    executor(&provider).run(&input()).await;

    let calls = provider.calls_for(Stage::Outline);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].user_instruction, calls[1].user_instruction);
}

#[tokio::test]
async fn test_research_failure_is_fatal() {
    let provider = Arc::new(ScriptedProvider::happy().then(Stage::Research, [server_error()]));

    let result = executor(&provider).run(&input()).await;

    assert!(!result.success);
    assert_eq!(result.retry_count, 0);
    assert!(result.error.as_deref().unwrap().starts_with("Research failed:"));
    assert!(result.research.is_none());
    assert_eq!(provider.stages_called(), [Stage::Research]);
}

#[tokio::test]
async fn test_unparseable_research_is_fatal() {
    let provider = Arc::new(ScriptedProvider::happy().then(
        Stage::Research,
        [Reply::Text("I cannot help".to_string())],
    ));

    let result = executor(&provider).run(&input()).await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().starts_with("Research failed:"));
}

#[tokio::test]
async fn test_each_draft_sees_only_earlier_sections() {
    let provider = Arc::new(ScriptedProvider::happy().then(
        Stage::DraftSection,
        drafts(&["ALPHA-BODY", "BRAVO-BODY", "CHARLIE-BODY", "DELTA-BODY", "ECHO-BODY"]),
    ));

    let result = executor(&provider).run(&input()).await;
    assert!(result.success);

    let calls = provider.calls_for(Stage::DraftSection);
    assert_eq!(calls.len(), 5);

    assert!(!calls[0].user_instruction.contains("ALPHA-BODY"));

    let third = &calls[2].user_instruction;
    assert!(third.contains("ALPHA-BODY"));
    assert!(third.contains("BRAVO-BODY"));
    assert!(!third.contains("CHARLIE-BODY"));

    // Only the two most recent sections are carried forward.
    let fourth = &calls[3].user_instruction;
    assert!(!fourth.contains("ALPHA-BODY"));
    assert!(fourth.contains("BRAVO-BODY"));
    assert!(fourth.contains("CHARLIE-BODY"));
}

#[tokio::test]
async fn test_context_window_follows_config() {
    let provider = Arc::new(ScriptedProvider::happy().then(
        Stage::DraftSection,
        drafts(&["ALPHA-BODY", "BRAVO-BODY", "CHARLIE-BODY", "DELTA-BODY", "ECHO-BODY"]),
    ));
    let mut config = PipelineConfig::default();
    config.previous_section_window = 4;

    executor_with(&provider, config).run(&input()).await;

    let last = &provider.calls_for(Stage::DraftSection)[4].user_instruction;
    for body in ["ALPHA-BODY", "BRAVO-BODY", "CHARLIE-BODY", "DELTA-BODY"] {
        assert!(last.contains(body), "missing {body}");
    }
}

#[tokio::test]
async fn test_failed_section_is_omitted_but_run_succeeds() {
    let mut replies = drafts(&["ALPHA-BODY", "unused", "CHARLIE-BODY", "DELTA-BODY", "ECHO-BODY"]);
    replies[1] = server_error();
    let provider = Arc::new(ScriptedProvider::happy().then(Stage::DraftSection, replies));

    let result = executor(&provider).run(&input()).await;

    assert!(result.success);
    let sections = result.sections.as_ref().unwrap();
    let keys: Vec<_> = sections.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, ["intro", "solution", "conclusion", "cta"]);
    assert_eq!(
        result.full_draft.as_deref().unwrap(),
        ["ALPHA-BODY", "CHARLIE-BODY", "DELTA-BODY", "ECHO-BODY"].join(SECTION_SEPARATOR)
    );

    let completeness = &result.quality_gates.as_ref().unwrap().completeness;
    assert!(completeness.passed);
    assert_eq!(completeness.reason.as_deref(), Some("4/5 sections completed"));

    // The failed section contributes nothing to later prompts.
    let third = &provider.calls_for(Stage::DraftSection)[2].user_instruction;
    assert!(third.contains("ALPHA-BODY"));
}

#[tokio::test]
async fn test_completeness_fails_below_threshold() {
    let mut replies = drafts(&["ALPHA-BODY", "unused", "unused", "DELTA-BODY", "ECHO-BODY"]);
    replies[1] = server_error();
    replies[2] = Reply::Text(draft_json("solution", "   "));
    let provider = Arc::new(ScriptedProvider::happy().then(Stage::DraftSection, replies));

    let result = executor(&provider).run(&input()).await;

    assert!(result.success);
    let gates = result.quality_gates.as_ref().unwrap();
    assert!(!gates.completeness.passed);
    assert_eq!(gates.completeness.reason.as_deref(), Some("3/5 sections completed"));
    assert!(!gates.all_passed());
}

#[tokio::test]
async fn test_echoed_key_is_replaced_by_outline_key() {
    let provider = Arc::new(ScriptedProvider::happy().then(
        Stage::DraftSection,
        [Reply::Text(draft_json("introduction-typo", "Intro text."))],
    ));

    let result = executor(&provider).run(&input()).await;

    let sections = result.sections.as_ref().unwrap();
    assert_eq!(sections[0].key.as_str(), "intro");
    assert_eq!(sections[0].content, "Intro text.");
}

#[tokio::test]
async fn test_seo_failure_degrades() {
    let provider = Arc::new(ScriptedProvider::happy().always(Stage::Seo, server_error()));

    let result = executor(&provider).run(&input()).await;

    assert!(result.success);
    assert!(result.seo_metadata.is_none());
    let gates = result.quality_gates.as_ref().unwrap();
    assert!(gates.seo.is_none());
    assert!(gates.voice_tone.is_some());
    // Gates that did not run do not count against the run.
    assert!(gates.all_passed());
    assert!(result.voice_tone_report.is_some());
}

#[tokio::test]
async fn test_seo_out_of_range_fails_gate_only() {
    let provider = Arc::new(
        ScriptedProvider::happy().always(Stage::Seo, Reply::Text(seo_json(10, 140, 1.5))),
    );

    let result = executor(&provider).run(&input()).await;

    assert!(result.success);
    assert!(result.seo_metadata.is_some());
    let seo = result.quality_gates.as_ref().unwrap().seo.clone().unwrap();
    assert!(!seo.passed);
    assert!(seo.reason.unwrap().starts_with("Title length 10"));
}

#[tokio::test]
async fn test_voice_tone_failure_degrades() {
    let provider = Arc::new(
        ScriptedProvider::happy().always(Stage::VoiceTone, Reply::Text("{ broken".to_string())),
    );

    let result = executor(&provider).run(&input()).await;

    assert!(result.success);
    assert!(result.voice_tone_report.is_none());
    assert!(result.quality_gates.as_ref().unwrap().voice_tone.is_none());
    assert!(result.seo_metadata.is_some());
}

#[tokio::test]
async fn test_voice_tone_gate_needs_score_and_model_verdict() {
    for (score, passed, expected) in [(80, true, true), (80, false, false), (79, true, false)] {
        let provider = Arc::new(ScriptedProvider::happy().always(
            Stage::VoiceTone,
            Reply::Text(voice_tone_json(score, passed)),
        ));

        let result = executor(&provider).run(&input()).await;

        assert!(result.success);
        let gate = result.quality_gates.as_ref().unwrap().voice_tone.clone().unwrap();
        assert_eq!(gate.passed, expected, "score {score}, passed {passed}");
        assert_eq!(gate.score, Some(f64::from(score)));
    }
}

#[tokio::test]
async fn test_timed_out_sections_are_skipped() {
    let provider = Arc::new(ScriptedProvider::happy().always(Stage::DraftSection, Reply::Hang));
    let mut config = PipelineConfig::default();
    config.policy.call_timeout_ms = Some(20);

    let result = executor_with(&provider, config).run(&input()).await;

    assert!(result.success);
    assert!(result.sections.as_ref().unwrap().is_empty());
    assert_eq!(result.full_draft.as_deref(), Some(""));
    let completeness = &result.quality_gates.as_ref().unwrap().completeness;
    assert!(!completeness.passed);
    assert_eq!(completeness.reason.as_deref(), Some("0/5 sections completed"));
}

#[tokio::test]
async fn test_pre_cancelled_run_reports_cancellation() {
    let provider = Arc::new(ScriptedProvider::happy());
    let token = CancellationToken::new();
    token.cancel();

    let result = executor(&provider).run_with_cancellation(&input(), token).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Pipeline cancelled"));
    assert!(provider.calls_for(Stage::Outline).is_empty());
}

#[tokio::test]
async fn test_cancellation_during_drafting_stops_the_run() {
    let provider = Arc::new(ScriptedProvider::happy().always(Stage::DraftSection, Reply::Hang));
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = executor(&provider).run_with_cancellation(&input(), token).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Pipeline cancelled"));
    assert_eq!(provider.calls_for(Stage::DraftSection).len(), 1);
    assert!(provider.calls_for(Stage::Seo).is_empty());
}

#[tokio::test]
async fn test_invalid_input_makes_no_provider_calls() {
    let provider = Arc::new(ScriptedProvider::happy());
    let input = PipelineInput {
        topic: "   ".to_string(),
        ..input()
    };

    let result = executor(&provider).run(&input).await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().starts_with("Invalid pipeline input"));
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let provider = Arc::new(ScriptedProvider::happy());
    let mut config = PipelineConfig::default();
    config.policy.max_outline_attempts = 0;

    assert!(PipelineExecutor::new(provider, config).is_err());
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .always(Stage::Research, Reply::Text(research_json()))
            .always(Stage::Outline, Reply::Text(valid_outline_json()))
            .always(Stage::DraftSection, Reply::Text(draft_json("x", "Shared body.")))
            .always(Stage::Seo, Reply::Text(seo_json(55, 140, 1.5)))
            .always(Stage::VoiceTone, Reply::Text(voice_tone_json(90, true))),
    );
    let executor = Arc::new(executor(&provider));

    let first = input();
    let second = PipelineInput {
        topic: "Load Test".to_string(),
        ..input()
    };
    let (a, b) = tokio::join!(executor.run(&first), executor.run(&second));

    assert!(a.success && b.success);
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.sections.unwrap().len(), 5);
    assert_eq!(b.sections.unwrap().len(), 5);
    assert_eq!(provider.calls_for(Stage::Research).len(), 2);
}

fn always_invalid_outline(backoff: Backoff) -> (Arc<ScriptedProvider>, PipelineConfig) {
    let provider = Arc::new(
        ScriptedProvider::happy().always(Stage::Outline, Reply::Text(smoke_outline_json())),
    );
    let mut config = PipelineConfig::default();
    config.policy.backoff = backoff;
    (provider, config)
}

#[tokio::test]
async fn test_fixed_backoff_delays_outline_retries() {
    let (provider, config) = always_invalid_outline(Backoff::Fixed { delay_ms: 100 });

    let started = Instant::now();
    let result = executor_with(&provider, config).run(&input()).await;
    let elapsed = started.elapsed();

    assert!(!result.success);
    assert_eq!(result.retry_count, 3);
    assert_eq!(provider.calls_for(Stage::Outline).len(), 3);
    // Two waits: none after the final attempt.
    assert!(elapsed >= Duration::from_millis(200), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn test_exponential_backoff_grows_between_retries() {
    let (provider, config) = always_invalid_outline(Backoff::Exponential {
        initial_ms: 40,
        max_ms: 1000,
    });

    let started = Instant::now();
    let result = executor_with(&provider, config).run(&input()).await;
    let elapsed = started.elapsed();

    assert!(!result.success);
    assert_eq!(result.retry_count, 3);
    // 40ms then 80ms.
    assert!(elapsed >= Duration::from_millis(110), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn test_rate_limit_hint_sets_minimum_wait() {
    let provider = Arc::new(ScriptedProvider::happy().then(
        Stage::Outline,
        [Reply::Fail(ProviderError::RateLimited {
            retry_after: Some(Duration::from_millis(300)),
        })],
    ));

    let started = Instant::now();
    let result = executor(&provider).run(&input()).await;
    let elapsed = started.elapsed();

    assert!(result.success, "unexpected error: {:?}", result.error);
    assert_eq!(result.retry_count, 1);
    assert_eq!(provider.calls_for(Stage::Outline).len(), 2);
    assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn test_cancellation_during_backoff_stops_the_run() {
    let (provider, config) = always_invalid_outline(Backoff::Fixed { delay_ms: 10_000 });
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = executor_with(&provider, config)
        .run_with_cancellation(&input(), token)
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Pipeline cancelled"));
    assert_eq!(result.retry_count, 1);
    assert_eq!(provider.calls_for(Stage::Outline).len(), 1);
}

#[tokio::test]
async fn test_provider_panic_becomes_failed_result() {
    let provider = Arc::new(
        ScriptedProvider::happy().always(Stage::Research, Reply::Panic("backend client bug")),
    );

    let result = executor(&provider).run(&input()).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Pipeline panicked: backend client bug")
    );
    assert!(result.research.is_none());
}

#[tokio::test]
async fn test_panic_after_outline_retry_keeps_retry_count() {
    let provider = Arc::new(
        ScriptedProvider::happy()
            .then(Stage::Outline, [Reply::Text(smoke_outline_json())])
            .always(Stage::DraftSection, Reply::Panic("draft exploded")),
    );

    // Run on its own task: a panic escaping the executor would surface as a JoinError.
    let executor = Arc::new(executor(&provider));
    let result = tokio::spawn(async move { executor.run(&input()).await })
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.retry_count, 1);
    assert_eq!(
        result.error.as_deref(),
        Some("Pipeline panicked: draft exploded")
    );
}
