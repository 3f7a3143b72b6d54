use super::*;
use crate::message::Tool;
use serde_json::json;

const CLIENT: &str = "client-a";

fn validator() -> Validator {
    Validator::new(5)
}

fn draw_json(points: usize) -> String {
    let points: Vec<_> = (0..points).map(|i| json!({"x": i, "y": i})).collect();
    json!({
        "type": "draw",
        "clientId": CLIENT,
        "payload": {"tool": "pen", "color": "#112233", "size": 4, "points": points}
    })
    .to_string()
}

fn assert_schema(result: Result<Message, ValidationError>) {
    assert!(
        matches!(result, Err(ValidationError::SchemaViolation(_))),
        "expected schema violation, got {result:?}"
    );
}

// =============================================================================
// envelope
// =============================================================================

#[test]
fn unparseable_text_is_malformed() {
    let err = validator().validate("{not json", CLIENT).unwrap_err();
    assert!(matches!(err, ValidationError::MalformedJson(_)));
    assert_eq!(err.error_code(), "E_MALFORMED_JSON");
}

#[test]
fn non_object_is_malformed() {
    let err = validator().validate("[1, 2, 3]", CLIENT).unwrap_err();
    assert!(matches!(err, ValidationError::MalformedJson(_)));
}

#[test]
fn missing_type_and_client_id_are_reported() {
    let no_type = json!({"clientId": CLIENT, "payload": {"x": 1, "y": 1}}).to_string();
    assert_eq!(validator().validate(&no_type, CLIENT), Err(ValidationError::MissingField("type")));

    let no_client = json!({"type": "cursor", "payload": {"x": 1, "y": 1}}).to_string();
    assert_eq!(validator().validate(&no_client, CLIENT), Err(ValidationError::MissingField("clientId")));
}

#[test]
fn client_id_must_match_connection() {
    let raw = json!({"type": "cursor", "clientId": "someone-else", "payload": {"x": 1, "y": 1}}).to_string();
    let err = validator().validate(&raw, CLIENT).unwrap_err();
    assert_eq!(err, ValidationError::ClientIdMismatch);
    assert_eq!(err.error_code(), "E_CLIENT_ID_MISMATCH");
}

#[test]
fn unknown_top_level_field_is_rejected() {
    let raw = json!({"type": "clear", "clientId": CLIENT, "extra": true}).to_string();
    assert_schema(validator().validate(&raw, CLIENT));
}

#[test]
fn unknown_and_server_only_types_are_rejected() {
    for kind in ["erase_all", "user_count", "board_state", "error"] {
        let raw = json!({"type": kind, "clientId": CLIENT, "payload": {}}).to_string();
        assert_schema(validator().validate(&raw, CLIENT));
    }
}

// =============================================================================
// draw
// =============================================================================

#[test]
fn valid_draw_is_typed() {
    let msg = validator().validate(&draw_json(3), CLIENT).expect("valid draw");
    assert!(msg.is_persistent());
    let Body::Draw(draw) = msg.body else {
        panic!("expected draw");
    };
    assert_eq!(draw.tool, Tool::Pen);
    assert_eq!(draw.size, 4);
    assert_eq!(draw.points.len(), 3);
}

#[test]
fn draw_point_count_is_bounded() {
    assert!(validator().validate(&draw_json(5), CLIENT).is_ok());
    assert_schema(validator().validate(&draw_json(6), CLIENT));
    assert_schema(validator().validate(&draw_json(0), CLIENT));
}

#[test]
fn draw_rejects_out_of_range_fields() {
    let cases = [
        json!({"tool": "pen", "color": "#112233", "size": 0, "points": [{"x": 0, "y": 0}]}),
        json!({"tool": "pen", "color": "#112233", "size": 101, "points": [{"x": 0, "y": 0}]}),
        json!({"tool": "pen", "color": "#112233", "size": 2.5, "points": [{"x": 0, "y": 0}]}),
        json!({"tool": "pen", "color": "112233", "size": 4, "points": [{"x": 0, "y": 0}]}),
        json!({"tool": "pen", "color": "#11223G", "size": 4, "points": [{"x": 0, "y": 0}]}),
        json!({"tool": "brush", "color": "#112233", "size": 4, "points": [{"x": 0, "y": 0}]}),
        json!({"tool": "pen", "color": "#112233", "size": 4, "points": [{"x": 10_001, "y": 0}]}),
        json!({"tool": "pen", "color": "#112233", "size": 4, "points": [{"x": 0, "y": -10_000.5}]}),
        json!({"tool": "pen", "color": "#112233", "size": 4, "points": [{"x": 0, "y": 0}], "opacity": 1}),
    ];
    for payload in cases {
        let raw = json!({"type": "draw", "clientId": CLIENT, "payload": payload}).to_string();
        assert_schema(validator().validate(&raw, CLIENT));
    }
}

#[test]
fn draw_accepts_boundary_values() {
    let raw = json!({
        "type": "draw",
        "clientId": CLIENT,
        "payload": {"tool": "eraser", "color": "#aBcDeF", "size": 100, "points": [{"x": -10_000, "y": 10_000}]}
    })
    .to_string();
    assert!(validator().validate(&raw, CLIENT).is_ok());
}

#[test]
fn draw_accepts_whole_float_size() {
    let raw = json!({
        "type": "draw",
        "clientId": CLIENT,
        "payload": {"tool": "pen", "color": "#112233", "size": 4.0, "points": [{"x": 0, "y": 0}]}
    })
    .to_string();
    let msg = validator().validate(&raw, CLIENT).expect("whole float size");
    let Body::Draw(draw) = msg.body else {
        panic!("expected draw");
    };
    assert_eq!(draw.size, 4);

    let raw = json!({
        "type": "draw",
        "clientId": CLIENT,
        "payload": {"tool": "pen", "color": "#112233", "size": 100.0, "points": [{"x": 0, "y": 0}]}
    })
    .to_string();
    assert!(validator().validate(&raw, CLIENT).is_ok());
}

#[test]
fn draw_without_payload_is_schema_violation() {
    let raw = json!({"type": "draw", "clientId": CLIENT}).to_string();
    assert_schema(validator().validate(&raw, CLIENT));
}

// =============================================================================
// text / clear / cursor
// =============================================================================

#[test]
fn text_defaults_font_and_bounds_content() {
    let raw = json!({
        "type": "text",
        "clientId": CLIENT,
        "payload": {"content": "hello", "x": 5, "y": 6, "color": "#000000"}
    })
    .to_string();
    let msg = validator().validate(&raw, CLIENT).expect("valid text");
    let Body::Text(text) = msg.body else {
        panic!("expected text");
    };
    assert_eq!(text.font, crate::message::DEFAULT_FONT);

    let long = "é".repeat(MAX_TEXT_CHARS + 1);
    let raw = json!({
        "type": "text",
        "clientId": CLIENT,
        "payload": {"content": long, "x": 5, "y": 6, "color": "#000000"}
    })
    .to_string();
    assert_schema(validator().validate(&raw, CLIENT));
}

#[test]
fn text_limit_counts_characters_not_bytes() {
    let content = "é".repeat(MAX_TEXT_CHARS);
    let raw = json!({
        "type": "text",
        "clientId": CLIENT,
        "payload": {"content": content, "x": 0, "y": 0, "font": "12px serif", "color": "#ffffff"}
    })
    .to_string();
    assert!(validator().validate(&raw, CLIENT).is_ok());
}

#[test]
fn text_font_is_bounded() {
    let text_with_font = |font: String| {
        json!({
            "type": "text",
            "clientId": CLIENT,
            "payload": {"content": "hi", "x": 0, "y": 0, "font": font, "color": "#ffffff"}
        })
        .to_string()
    };
    let max = format!("{}px serif", "1".repeat(MAX_FONT_CHARS - "px serif".len()));
    assert_eq!(max.chars().count(), MAX_FONT_CHARS);
    assert!(validator().validate(&text_with_font(max), CLIENT).is_ok());

    let long = "a".repeat(MAX_FONT_CHARS + 1);
    assert_schema(validator().validate(&text_with_font(long), CLIENT));
}

#[test]
fn clear_accepts_absent_null_or_empty_payload() {
    for raw in [
        json!({"type": "clear", "clientId": CLIENT}),
        json!({"type": "clear", "clientId": CLIENT, "payload": null}),
        json!({"type": "clear", "clientId": CLIENT, "payload": {}}),
    ] {
        let msg = validator().validate(&raw.to_string(), CLIENT).expect("valid clear");
        assert_eq!(msg.body, Body::Clear);
    }
    let raw = json!({"type": "clear", "clientId": CLIENT, "payload": {"all": true}}).to_string();
    assert_schema(validator().validate(&raw, CLIENT));
}

#[test]
fn cursor_is_transient() {
    let raw = json!({"type": "cursor", "clientId": CLIENT, "payload": {"x": 12.5, "y": -3}}).to_string();
    let msg = validator().validate(&raw, CLIENT).expect("valid cursor");
    assert!(!msg.is_persistent());
    assert_eq!(msg.kind(), "cursor");
}

#[test]
fn hex_color_pattern() {
    assert!(is_hex_color("#112233"));
    assert!(is_hex_color("#ABCdef"));
    assert!(!is_hex_color("#1122"));
    assert!(!is_hex_color("#1122334"));
    assert!(!is_hex_color("red"));
    assert!(!is_hex_color(""));
}
