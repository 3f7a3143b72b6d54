use super::*;
use serde_json::json;

fn pen_stroke(client_id: &str) -> Message {
    Message::new(
        client_id,
        Body::Draw(DrawPayload {
            tool: Tool::Pen,
            color: "#112233".into(),
            size: 4,
            points: vec![Point { x: 1.0, y: 2.0 }, Point { x: 3.0, y: 4.0 }],
        }),
    )
}

#[test]
fn draw_serializes_with_wire_field_names() {
    let value = serde_json::to_value(pen_stroke("alice")).expect("serialize");
    assert_eq!(value["type"], "draw");
    assert_eq!(value["clientId"], "alice");
    assert_eq!(value["payload"]["tool"], "pen");
    assert_eq!(value["payload"]["color"], "#112233");
    assert_eq!(value["payload"]["size"], 4);
    assert_eq!(value["payload"]["points"][1]["x"], 3.0);
}

#[test]
fn clear_serializes_without_payload() {
    let value = serde_json::to_value(Message::new("alice", Body::Clear)).expect("serialize");
    assert_eq!(value, json!({"type": "clear", "clientId": "alice"}));
}

#[test]
fn server_messages_use_reserved_client_id() {
    let count = serde_json::to_value(Message::user_count(3)).expect("serialize");
    assert_eq!(count, json!({"type": "user_count", "clientId": "server", "payload": {"count": 3}}));

    let state = Message::board_state(vec![pen_stroke("bob")]);
    assert_eq!(state.client_id, SERVER_CLIENT_ID);
    let value = serde_json::to_value(&state).expect("serialize");
    assert_eq!(value["payload"]["actions"][0]["type"], "draw");
    assert_eq!(value["payload"]["actions"][0]["clientId"], "bob");
}

#[test]
fn encoded_board_state_decodes_back() {
    let note = Message::new(
        "carol",
        Body::Text(TextPayload {
            content: "hi".into(),
            x: 10.0,
            y: 20.0,
            font: DEFAULT_FONT.into(),
            color: "#abcdef".into(),
        }),
    );
    let state = Message::board_state(vec![pen_stroke("bob"), note]);
    let text = state.encode().expect("encode");
    let restored: Message = serde_json::from_str(text.as_str()).expect("decode");
    assert_eq!(restored, state);
}

#[test]
fn error_from_typed_carries_code_and_retry_hint() {
    #[derive(Debug, thiserror::Error)]
    #[error("slow down")]
    struct Throttled;

    impl ErrorCode for Throttled {
        fn error_code(&self) -> &'static str {
            "E_RATE_LIMITED"
        }

        fn retryable(&self) -> bool {
            true
        }

        fn retry_after_secs(&self) -> Option<u64> {
            Some(60)
        }
    }

    let msg = Message::error_from(&Throttled);
    let Body::Error(payload) = &msg.body else {
        panic!("expected error body, got {}", msg.kind());
    };
    assert_eq!(payload.code, "E_RATE_LIMITED");
    assert_eq!(payload.message, "slow down");
    assert_eq!(payload.retry_after_secs, Some(60));
    assert!(payload.retryable);

    let value = serde_json::to_value(&msg).expect("serialize");
    assert_eq!(value["payload"]["retryable"], true);
}

#[test]
fn plain_error_omits_retry_fields_on_the_wire() {
    let err = crate::validate::ValidationError::ClientIdMismatch;
    let value = serde_json::to_value(Message::error_from(&err)).expect("serialize");
    assert!(value["payload"].get("retry_after_secs").is_none());
    assert!(value["payload"].get("retryable").is_none());
    assert_eq!(value["payload"]["code"], "E_CLIENT_ID_MISMATCH");
}

#[test]
fn draw_size_accepts_whole_floats_only() {
    let payload = |size: serde_json::Value| json!({"tool": "pen", "color": "#112233", "size": size, "points": []});

    let draw: DrawPayload = serde_json::from_value(payload(json!(4.0))).expect("whole float");
    assert_eq!(draw.size, 4);
    assert!(serde_json::from_value::<DrawPayload>(payload(json!(4.5))).is_err());
    assert!(serde_json::from_value::<DrawPayload>(payload(json!(-1))).is_err());
    assert!(serde_json::from_value::<DrawPayload>(payload(json!(5_000_000_000_u64))).is_err());
    assert!(serde_json::from_value::<DrawPayload>(payload(json!("4"))).is_err());
}

#[test]
fn persistent_kinds_are_draw_text_clear() {
    assert!(pen_stroke("a").is_persistent());
    assert!(Message::new("a", Body::Clear).is_persistent());
    assert!(!Message::new("a", Body::Cursor(CursorPayload { x: 0.0, y: 0.0 })).is_persistent());
    assert!(!Message::user_count(1).is_persistent());
    assert!(!Message::error_from(&crate::validate::ValidationError::ClientIdMismatch).is_persistent());
}
