use super::*;
use serde_json::json;

fn auth() -> AuthConfig {
    AuthConfig {
        auth_mode: AuthMode::Keys,
        region: "us-east-1".to_owned(),
        profile: None,
        access_key_id: Some("AKIA123".to_owned()),
        secret_access_key: Some("very-secret".to_owned()),
        session_token: None,
        model_id: Some("anthropic.claude-3".to_owned()),
    }
}

#[test]
fn encode_message_frame_uses_snake_case_tag_and_fields() {
    let frame = OutgoingFrame::Message {
        agent_id: "recon".to_owned(),
        message: "scan the repo".to_owned(),
        include_briefing: false,
        context: vec![ContextEntry {
            role: "user".to_owned(),
            content: "hi".to_owned(),
        }],
        auth_config: None,
    };

    let value: Value = serde_json::from_str(&encode_frame(&frame)).expect("valid json");
    assert_eq!(
        value,
        json!({
            "type": "message",
            "agent_id": "recon",
            "message": "scan the repo",
            "include_briefing": false,
            "context": [{"role": "user", "content": "hi"}]
        })
    );
}

#[test]
fn encode_message_frame_includes_auth_config_when_present() {
    let frame = OutgoingFrame::Message {
        agent_id: "conductor".to_owned(),
        message: "deploy".to_owned(),
        include_briefing: false,
        context: Vec::new(),
        auth_config: Some(auth()),
    };

    let value: Value = serde_json::from_str(&encode_frame(&frame)).expect("valid json");
    assert_eq!(value["auth_config"]["auth_mode"], "keys");
    assert_eq!(value["auth_config"]["region"], "us-east-1");
    assert!(value["auth_config"].get("profile").is_none());
}

#[test]
fn encode_switch_agent_and_set_auth_frames() {
    let switch = encode_frame(&OutgoingFrame::SwitchAgent {
        agent_id: "janitor".to_owned(),
    });
    assert_eq!(
        serde_json::from_str::<Value>(&switch).expect("json"),
        json!({"type": "switch_agent", "agent_id": "janitor"})
    );

    let set_auth = encode_frame(&OutgoingFrame::SetAuth { auth_config: auth() });
    let value: Value = serde_json::from_str(&set_auth).expect("json");
    assert_eq!(value["type"], "set_auth");
    assert_eq!(value["auth_config"]["access_key_id"], "AKIA123");
}

#[test]
fn decode_every_incoming_frame_type() {
    let cases = [
        (json!({"type":"response","agent_id":"recon","message":"done","status":"ok"}), "response"),
        (json!({"type":"stream_start","message_id":"m1","agent_id":"recon"}), "stream_start"),
        (json!({"type":"stream_chunk","message_id":"m1","content":"Hel"}), "stream_chunk"),
        (json!({"type":"stream_end","message_id":"m1","agent_id":"recon"}), "stream_end"),
        (json!({"type":"error","message":"rate limited"}), "error"),
        (json!({"type":"agent_switched","agent_id":"qa","agent_name":"QA"}), "agent_switched"),
        (json!({"type":"auth_status","ok":true,"message":"valid"}), "auth_status"),
    ];

    for (value, kind) in cases {
        let frame = decode_frame(&value.to_string()).expect("frame should decode");
        assert_eq!(frame.kind(), kind);
    }
}

#[test]
fn decode_response_keeps_metrics_and_tolerates_their_absence() {
    let with = decode_frame(
        &json!({"type":"response","agent_id":"a","message":"m","status":"ok","metrics":{"tokens":12}})
            .to_string(),
    )
    .expect("decode");
    let IncomingFrame::Response { metrics, .. } = with else {
        panic!("expected response frame");
    };
    assert_eq!(metrics.expect("metrics")["tokens"], 12);

    let without = decode_frame(&json!({"type":"response","message":"m"}).to_string()).expect("decode");
    assert_eq!(
        without,
        IncomingFrame::Response {
            agent_id: String::new(),
            message: "m".to_owned(),
            status: String::new(),
            metrics: None,
        }
    );
}

#[test]
fn decode_ignores_unknown_extra_fields() {
    let frame = decode_frame(r#"{"type":"error","message":"boom","trace_id":"t-9"}"#).expect("decode");
    assert_eq!(
        frame,
        IncomingFrame::Error {
            message: "boom".to_owned()
        }
    );
}

#[test]
fn decode_rejects_unknown_type() {
    let err = decode_frame(r#"{"type":"telemetry","message":"x"}"#).expect_err("unknown type");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_rejects_malformed_text() {
    assert!(decode_frame("not json at all").is_err());
    assert!(decode_frame(r#"{"message":"no type"}"#).is_err());
    assert!(decode_frame(r#"{"type":"stream_chunk"}"#).is_err());
}

#[test]
fn incoming_frames_survive_the_wire_with_unicode() {
    let frame = IncomingFrame::StreamChunk {
        message_id: "m-1".to_owned(),
        content: "naïve 🚀 こんにちは e\u{301}".to_owned(),
    };
    assert_eq!(decode_frame(&serde_json::to_string(&frame).expect("encode")).expect("decode"), frame);
}

#[test]
fn outgoing_frames_read_back_as_client_frames() {
    let frame: OutgoingFrame =
        serde_json::from_str(r#"{"type":"switch_agent","agent_id":"ops"}"#).expect("decode");
    assert_eq!(frame.kind(), "switch_agent");
}

#[test]
fn auth_config_debug_redacts_secrets() {
    let rendered = format!("{:?}", auth());
    assert!(rendered.contains("us-east-1"));
    assert!(rendered.contains("<redacted>"));
    assert!(!rendered.contains("very-secret"));
    assert!(!rendered.contains("AKIA123"));
}

#[test]
fn auth_mode_defaults_to_env() {
    let config: AuthConfig = serde_json::from_str(r#"{"auth_mode":"env","region":"eu-west-1"}"#).expect("decode");
    assert_eq!(config.auth_mode, AuthMode::Env);
    assert_eq!(AuthConfig::default().auth_mode, AuthMode::Env);
}
