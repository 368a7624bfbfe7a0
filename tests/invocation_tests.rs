use bytes::Bytes;

use bedrock_agent_runner::clients::mock::MockRuntime;
use bedrock_agent_runner::core::StreamFragment;
use bedrock_agent_runner::error::RuntimeError;
use bedrock_agent_runner::invocation::InvocationClient;

async fn invoke(client: &InvocationClient<MockRuntime>) -> Result<String, RuntimeError> {
    client.invoke("AGENT00001", "DRAFT", "my-session-001", "Hello?").await
}

#[tokio::test]
async fn text_fragments_concatenate_in_arrival_order() {
    let (runtime, handle) = MockRuntime::new();
    handle.script_fragments([
        Ok(StreamFragment::text("Hel")),
        Ok(StreamFragment::Trace("{\"orchestrationTrace\":{}}".into())),
        Ok(StreamFragment::text("lo")),
    ]);
    let client = InvocationClient::new(runtime);

    assert_eq!(invoke(&client).await.unwrap(), "Hello");
}

#[tokio::test]
async fn empty_stream_yields_empty_answer() {
    let (runtime, _handle) = MockRuntime::new();
    let client = InvocationClient::new(runtime);

    assert_eq!(invoke(&client).await.unwrap(), "");
}

#[tokio::test]
async fn trace_only_stream_yields_empty_answer() {
    let (runtime, handle) = MockRuntime::new();
    handle.script_fragments([Ok(StreamFragment::Trace("pre".into())), Ok(StreamFragment::Trace("post".into()))]);
    let client = InvocationClient::new(runtime);

    assert_eq!(invoke(&client).await.unwrap(), "");
}

#[tokio::test]
async fn text_is_not_trimmed_or_altered() {
    let (runtime, handle) = MockRuntime::new();
    handle.script_fragments([Ok(StreamFragment::text("  Seattle\n")), Ok(StreamFragment::text("is rainy.  "))]);
    let client = InvocationClient::new(runtime);

    assert_eq!(invoke(&client).await.unwrap(), "  Seattle\nis rainy.  ");
}

#[tokio::test]
async fn sink_sees_each_text_fragment_as_it_arrives() {
    let (runtime, _handle) = MockRuntime::with_text_chunks(["one ", "two ", "three"]);
    let client = InvocationClient::new(runtime);
    let mut seen = Vec::new();

    let answer = client
        .invoke_with("AGENT00001", "DRAFT", "s", "count", |t| seen.push(t.to_string()))
        .await
        .unwrap();

    assert_eq!(seen, vec!["one ", "two ", "three"]);
    assert_eq!(answer, "one two three");
}

#[tokio::test]
async fn session_is_forwarded_to_the_runtime() {
    let (runtime, handle) = MockRuntime::new();
    let client = InvocationClient::new(runtime);

    invoke(&client).await.unwrap();

    let sessions = handle.invocations();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].agent_id, "AGENT00001");
    assert_eq!(sessions[0].alias_id, "DRAFT");
    assert_eq!(sessions[0].session_id, "my-session-001");
    assert_eq!(sessions[0].input_text, "Hello?");
}

#[tokio::test]
async fn invalid_utf8_aborts_without_partial_result() {
    let (runtime, handle) = MockRuntime::new();
    handle.script_fragments([
        Ok(StreamFragment::text("ok")),
        Ok(StreamFragment::Text(Bytes::from_static(&[0xff, 0xfe]))),
        Ok(StreamFragment::text("never")),
    ]);
    let client = InvocationClient::new(runtime);

    let err = invoke(&client).await.unwrap_err();

    assert!(matches!(err, RuntimeError::Decode(_)));
}

#[tokio::test]
async fn mid_stream_failure_propagates() {
    let (runtime, handle) = MockRuntime::new();
    handle.script_fragments([
        Ok(StreamFragment::text("partial")),
        Err(RuntimeError::Stream("connection reset".into())),
    ]);
    let client = InvocationClient::new(runtime);

    assert_eq!(invoke(&client).await.unwrap_err(), RuntimeError::Stream("connection reset".into()));
}

#[tokio::test]
async fn open_failure_propagates() {
    let (runtime, handle) = MockRuntime::new();
    handle.fail_open_with(RuntimeError::Api("ResourceNotFoundException: alias DRAFT".into()));
    let client = InvocationClient::new(runtime);

    assert!(matches!(invoke(&client).await.unwrap_err(), RuntimeError::Api(_)));
}
