use courier_agent::backends::mock::{script, MockRuntime};
use courier_agent::{AgentEvent, AgentRuntime, ToolStatus};
use std::time::Duration;

#[tokio::test]
async fn test_mock_returns_scripted_text_response() {
    let mock = MockRuntime::new().on_prompt("hello").respond_text("Hi there!");

    let session_id = mock.create_session(None).await.unwrap();
    let mut sub = mock.subscribe_events();
    mock.prompt_async(&session_id, "hello").await.unwrap();

    let event = sub.recv().await.unwrap();
    match event {
        AgentEvent::TextUpdate { text, session_id: sid, .. } => {
            assert_eq!(text, "Hi there!");
            assert_eq!(sid, session_id);
        }
        _ => panic!("Expected TextUpdate event, got {:?}", event),
    }
    assert!(matches!(
        sub.recv().await.unwrap(),
        AgentEvent::SessionIdle { .. }
    ));
}

#[tokio::test]
async fn test_mock_tool_script_rewrites_session_placeholder() {
    let mock = MockRuntime::new().on_prompt("read file").respond(vec![
        script::tool_running("t1", "read_file", Some("Reading foo")),
        script::text("p0", "Read the file"),
        script::idle(),
    ]);

    let session_id = mock.create_session(Some("files")).await.unwrap();
    let mut sub = mock.subscribe_events();
    mock.prompt_async(&session_id, "read file").await.unwrap();

    let mut events = vec![];
    for _ in 0..3 {
        events.push(sub.recv().await.unwrap());
    }

    assert!(matches!(
        &events[0],
        AgentEvent::ToolActivity { name, status: ToolStatus::Running, session_id: sid, .. }
            if name == "read_file" && sid == &session_id
    ));
    assert!(matches!(&events[2], AgentEvent::SessionIdle { session_id: sid } if sid == &session_id));
}

#[tokio::test]
async fn test_mock_unmatched_prompt_still_goes_idle() {
    let mock = MockRuntime::new();
    let session_id = mock.create_session(None).await.unwrap();
    let mut sub = mock.subscribe_events();
    mock.prompt_async(&session_id, "anything").await.unwrap();

    assert!(matches!(
        sub.recv().await.unwrap(),
        AgentEvent::TextUpdate { .. }
    ));
    assert!(matches!(
        sub.recv().await.unwrap(),
        AgentEvent::SessionIdle { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_mock_timed_script_respects_delays() {
    let mock = MockRuntime::new().on_prompt("slow").respond_timed(vec![
        (Duration::from_secs(2), script::text("p0", "late")),
        (Duration::from_secs(1), script::idle()),
    ]);

    let session_id = mock.create_session(None).await.unwrap();
    let mut sub = mock.subscribe_events();
    let start = tokio::time::Instant::now();
    mock.prompt_async(&session_id, "slow").await.unwrap();

    sub.recv().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(2));
    sub.recv().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test]
async fn test_mock_records_abort_and_emits_aborted_error() {
    let mock = MockRuntime::new();
    let session_id = mock.create_session(None).await.unwrap();
    let mut sub = mock.subscribe_events();

    let ack = mock.abort(&session_id).await.unwrap();
    assert!(ack);
    assert_eq!(mock.aborts(), vec![session_id.clone()]);

    match sub.recv().await.unwrap() {
        AgentEvent::SessionError { error, .. } => assert!(error.aborted),
        other => panic!("Expected SessionError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mock_abort_without_ack_emits_nothing() {
    let mock = MockRuntime::new().ack_aborts(false);
    let session_id = mock.create_session(None).await.unwrap();

    let ack = mock.abort(&session_id).await.unwrap();
    assert!(!ack);
}

#[tokio::test]
async fn test_mock_records_question_replies_and_rejections() {
    let mock = MockRuntime::new();

    mock.reply_question("q1", vec![vec!["yes".to_string()]])
        .await
        .unwrap();
    mock.reject_question("q2").await.unwrap();

    assert_eq!(mock.replies()[0].0, "q1");
    assert_eq!(mock.replies()[0].1, vec![vec!["yes".to_string()]]);
    assert_eq!(mock.rejections(), vec!["q2".to_string()]);
}

#[tokio::test]
async fn test_mock_fork_and_list_sessions() {
    let mock = MockRuntime::new();
    let first = mock.create_session(Some("main")).await.unwrap();
    let forked = mock.fork_session(&first).await.unwrap();
    assert_ne!(first, forked);

    let sessions = mock.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].title, "main");
    assert!(sessions[1].title.contains(&first));
}
