use super::*;

fn request() -> VisionRequest<'static> {
    VisionRequest { system: "describe drawings", prompt: "what is this?", image_data_url: "data:image/png;base64,AAAA" }
}

#[test]
fn vision_messages_carry_system_prompt_and_image() {
    let messages = build_vision_messages(request());
    let value = serde_json::to_value(&messages).unwrap();
    assert_eq!(
        value,
        serde_json::json!([
            { "role": "system", "content": "describe drawings" },
            { "role": "user", "content": [
                { "type": "text", "text": "what is this?" },
                { "type": "image_url", "image_url": { "url": "data:image/png;base64,AAAA", "detail": "high" } }
            ]}
        ])
    );
}

#[test]
fn request_pins_sampling_parameters() {
    let messages = build_vision_messages(request());
    let body = CcRequest { model: "gpt-4o", max_tokens: 1000, temperature: TEMPERATURE, top_p: TOP_P, messages: &messages };
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["model"], "gpt-4o");
    assert_eq!(value["max_tokens"], 1000);
    assert_eq!(value["temperature"].as_f64(), Some(0.0));
    assert!((value["top_p"].as_f64().unwrap() - 0.1).abs() < 1e-6);
}

#[test]
fn parse_returns_first_choice_content() {
    let body = serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": "A red circle." }, "finish_reason": "stop" },
            { "index": 1, "message": { "role": "assistant", "content": "ignored" } }
        ]
    });
    let content = parse_chat_completions_response(&body.to_string()).unwrap();
    assert_eq!(content.as_deref(), Some("A red circle."));
}

#[test]
fn parse_null_content_is_none() {
    let body = serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": null } }] });
    assert_eq!(parse_chat_completions_response(&body.to_string()).unwrap(), None);
}

#[test]
fn parse_empty_choices_is_none() {
    let body = serde_json::json!({ "choices": [] });
    assert_eq!(parse_chat_completions_response(&body.to_string()).unwrap(), None);
}

#[test]
fn parse_rejects_non_json() {
    assert!(matches!(parse_chat_completions_response("<html>"), Err(LlmError::ApiParse(_))));
}

#[test]
fn parse_rejects_missing_choices() {
    let body = serde_json::json!({ "error": { "message": "nope" } });
    assert!(matches!(parse_chat_completions_response(&body.to_string()), Err(LlmError::ApiParse(_))));
}
