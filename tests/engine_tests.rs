// ABOUTME: Integration tests for the streaming prompt engine.
// ABOUTME: Covers filtering, throttling, heartbeats, questions, and terminal outcomes.

use courier::engine::{ProgressOptions, PromptEngine, TurnOutcome};
use courier_agent::backends::mock::{script, MockRuntime};
use courier_agent::{AgentEvent, AgentRuntime};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TURN_TIMEOUT: Duration = Duration::from_secs(600);

fn engine_for(mock: &MockRuntime) -> PromptEngine {
    PromptEngine::new(Arc::new(mock.clone()) as Arc<dyn AgentRuntime>)
}

/// Progress options counting tool notices and heartbeats
fn counting_progress(
    tools: &Arc<Mutex<Vec<String>>>,
    heartbeats: &Arc<Mutex<u32>>,
) -> ProgressOptions {
    let tools = Arc::clone(tools);
    let heartbeats = Arc::clone(heartbeats);
    ProgressOptions {
        on_tool_running: Some(Box::new(move |name, _title| {
            let tools = Arc::clone(&tools);
            Box::pin(async move {
                tools.lock().unwrap().push(name);
            })
        })),
        on_heartbeat: Some(Box::new(move || {
            let heartbeats = Arc::clone(&heartbeats);
            Box::pin(async move {
                *heartbeats.lock().unwrap() += 1;
            })
        })),
        ..ProgressOptions::default()
    }
}

#[tokio::test]
async fn test_completed_turn_returns_accumulated_text() {
    let mock = MockRuntime::new().on_prompt("hello").respond_text("Hi there!");
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let outcome = engine
        .run(&session, "hello", TURN_TIMEOUT, ProgressOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Completed("Hi there!".to_string()));
}

#[tokio::test]
async fn test_text_parts_join_in_first_observed_order() {
    let mock = MockRuntime::new().on_prompt("go").respond(vec![
        script::text("p1", "one"),
        script::text("p2", "two"),
        script::text("p1", "one, updated"),
        script::idle(),
    ]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let outcome = engine
        .run(&session, "go", TURN_TIMEOUT, ProgressOptions::default())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Completed("one, updated\n\ntwo".to_string())
    );
}

#[tokio::test]
async fn test_events_for_other_sessions_are_discarded() {
    let mock = MockRuntime::new().on_prompt("go").respond(vec![
        AgentEvent::TextUpdate {
            session_id: "some-other-session".to_string(),
            part_id: "p0".to_string(),
            text: "someone else's output".to_string(),
        },
        script::text("p0", "mine"),
        // A foreign idle must not terminate this turn
        AgentEvent::SessionIdle {
            session_id: "some-other-session".to_string(),
        },
        script::idle(),
    ]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let outcome = engine
        .run(&session, "go", TURN_TIMEOUT, ProgressOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Completed("mine".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_tool_notices_dedup_by_call_id_and_throttle() {
    let mock = MockRuntime::new().on_prompt("work").respond(vec![
        script::tool_running("t1", "read_file", None),
        // Same call id again: never notified twice
        script::tool_running("t1", "read_file", None),
        // Different call inside the throttle window: suppressed
        script::tool_running("t2", "web_search", None),
        script::idle(),
    ]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let tools = Arc::new(Mutex::new(Vec::new()));
    let heartbeats = Arc::new(Mutex::new(0));
    let outcome = engine
        .run(
            &session,
            "work",
            TURN_TIMEOUT,
            counting_progress(&tools, &heartbeats),
        )
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed(_)));
    assert_eq!(tools.lock().unwrap().as_slice(), ["read_file"]);
}

#[tokio::test(start_paused = true)]
async fn test_tool_notices_resume_after_throttle_window() {
    let mock = MockRuntime::new().on_prompt("work").respond_timed(vec![
        (Duration::ZERO, script::tool_running("t1", "read_file", None)),
        // Past the 5s global throttle window
        (
            Duration::from_secs(6),
            script::tool_running("t2", "web_search", None),
        ),
        (Duration::ZERO, script::idle()),
    ]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let tools = Arc::new(Mutex::new(Vec::new()));
    let heartbeats = Arc::new(Mutex::new(0));
    engine
        .run(
            &session,
            "work",
            TURN_TIMEOUT,
            counting_progress(&tools, &heartbeats),
        )
        .await
        .unwrap();

    assert_eq!(
        tools.lock().unwrap().as_slice(),
        ["read_file", "web_search"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_fires_once_per_silent_interval() {
    // 150s of silence with a 60s heartbeat: fires at 60s and 120s, never
    // twice within one interval
    let mock = MockRuntime::new()
        .on_prompt("quiet")
        .respond_timed(vec![(Duration::from_secs(150), script::idle())]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let tools = Arc::new(Mutex::new(Vec::new()));
    let heartbeats = Arc::new(Mutex::new(0));
    engine
        .run(
            &session,
            "quiet",
            TURN_TIMEOUT,
            counting_progress(&tools, &heartbeats),
        )
        .await
        .unwrap();

    assert_eq!(*heartbeats.lock().unwrap(), 2);
    assert!(tools.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tool_activity_resets_heartbeat_clock() {
    // Tool notice at 30s resets the silence clock: the 60s tick sees only
    // 30s of silence, so the first heartbeat lands on the 120s tick
    let mock = MockRuntime::new().on_prompt("work").respond_timed(vec![
        (
            Duration::from_secs(30),
            script::tool_running("t1", "read_file", None),
        ),
        (Duration::from_secs(120), script::idle()),
    ]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let tools = Arc::new(Mutex::new(Vec::new()));
    let heartbeats = Arc::new(Mutex::new(0));
    engine
        .run(
            &session,
            "work",
            TURN_TIMEOUT,
            counting_progress(&tools, &heartbeats),
        )
        .await
        .unwrap();

    assert_eq!(tools.lock().unwrap().len(), 1);
    assert_eq!(*heartbeats.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_quiet_fast_turn_has_no_progress_messages() {
    let mock = MockRuntime::new().on_prompt("quick").respond_text("done");
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let tools = Arc::new(Mutex::new(Vec::new()));
    let heartbeats = Arc::new(Mutex::new(0));
    let outcome = engine
        .run(
            &session,
            "quick",
            TURN_TIMEOUT,
            counting_progress(&tools, &heartbeats),
        )
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Completed("done".to_string()));
    assert!(tools.lock().unwrap().is_empty());
    assert_eq!(*heartbeats.lock().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_discards_partial_text() {
    // Partial text arrives but the session never goes idle
    let mock = MockRuntime::new()
        .on_prompt("stall")
        .respond(vec![script::text("p0", "partial output")]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let outcome = engine
        .run(
            &session,
            "stall",
            Duration::from_secs(10),
            ProgressOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::TimedOut);
}

#[tokio::test]
async fn test_aborted_error_yields_aborted_outcome() {
    let mock = MockRuntime::new()
        .on_prompt("work")
        .respond(vec![script::aborted()]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let outcome = engine
        .run(&session, "work", TURN_TIMEOUT, ProgressOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Aborted);
}

#[tokio::test]
async fn test_runtime_error_propagates() {
    let mock = MockRuntime::new()
        .on_prompt("work")
        .respond(vec![script::failed("backend exploded")]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let err = engine
        .run(&session, "work", TURN_TIMEOUT, ProgressOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("backend exploded"));
}

#[tokio::test(start_paused = true)]
async fn test_question_without_callback_is_rejected() {
    let mock = MockRuntime::new().on_prompt("ask").respond_timed(vec![
        (Duration::ZERO, script::question("q1", vec![])),
        (Duration::from_secs(1), script::idle()),
    ]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let outcome = engine
        .run(&session, "ask", TURN_TIMEOUT, ProgressOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed(_)));
    assert_eq!(mock.rejections(), vec!["q1".to_string()]);
    assert!(mock.replies().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_question_answers_are_forwarded() {
    let mock = MockRuntime::new().on_prompt("ask").respond_timed(vec![
        (Duration::ZERO, script::question("q1", vec![])),
        (Duration::from_secs(1), script::idle()),
    ]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let progress = ProgressOptions {
        on_question: Some(Box::new(|_prompt| {
            Box::pin(async move { Ok(vec![vec!["use staging".to_string()]]) })
        })),
        ..ProgressOptions::default()
    };

    engine
        .run(&session, "ask", TURN_TIMEOUT, progress)
        .await
        .unwrap();

    assert_eq!(mock.replies().len(), 1);
    assert_eq!(mock.replies()[0].0, "q1");
    assert_eq!(mock.replies()[0].1, vec![vec!["use staging".to_string()]]);
    assert!(mock.rejections().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failing_question_callback_rejects_and_turn_continues() {
    let mock = MockRuntime::new().on_prompt("ask").respond_timed(vec![
        (Duration::ZERO, script::question("q1", vec![])),
        (Duration::from_secs(1), script::text("p0", "went on without you")),
        (Duration::ZERO, script::idle()),
    ]);
    let engine = engine_for(&mock);
    let session = mock.create_session(None).await.unwrap();

    let progress = ProgressOptions {
        on_question: Some(Box::new(|_prompt| {
            Box::pin(async move { anyhow::bail!("nobody answered") })
        })),
        ..ProgressOptions::default()
    };

    let outcome = engine
        .run(&session, "ask", TURN_TIMEOUT, progress)
        .await
        .unwrap();

    // The question timeout ends only the question wait, not the turn
    assert_eq!(
        outcome,
        TurnOutcome::Completed("went on without you".to_string())
    );
    assert_eq!(mock.rejections(), vec!["q1".to_string()]);
}
