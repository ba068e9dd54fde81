use super::*;
use serde_json::json;

#[test]
fn set_api_key_request_uses_configured_identifier_field() {
    let by_id = SetApiKeyRequest {
        identifier: UserIdentifier::new(IdentifierField::UserId, "42"),
        api_key: "secret",
    };
    assert_eq!(
        serde_json::to_value(&by_id).expect("json"),
        json!({ "user_id": "42", "api_key": "secret" })
    );

    let by_name = SetApiKeyRequest {
        identifier: UserIdentifier::new(IdentifierField::UserName, "alice"),
        api_key: "secret",
    };
    assert_eq!(
        serde_json::to_value(&by_name).expect("json"),
        json!({ "user_name": "alice", "api_key": "secret" })
    );
}

#[test]
fn chat_request_omits_missing_identifiers() {
    let request = ChatRequest {
        prompt: "hi".to_string(),
        model: "gpt-4o-mini".to_string(),
        provider: "CHATGPT".to_string(),
        session_uuid: None,
        user_uuid: Some(UserUuid("u-1".to_string())),
    };
    assert_eq!(
        serde_json::to_value(&request).expect("json"),
        json!({
            "prompt": "hi",
            "model": "gpt-4o-mini",
            "provider": "CHATGPT",
            "user_uuid": "u-1"
        })
    );
}

#[test]
fn legacy_token_lookup_follows_candidate_order() {
    let cases = [
        (json!({ "token": "a", "access_token": "z" }), "a"),
        (json!({ "data": { "token": "b" } }), "b"),
        (json!({ "accessToken": "c" }), "c"),
        (json!({ "access_token": "d" }), "d"),
        (json!({ "token": "", "access_token": "e" }), "e"),
    ];
    for (body, expected) in cases {
        let token = normalize_key_exchange(&body, ResponseShapes::Legacy).expect("token");
        assert_eq!(token.expose(), expected, "body: {body}");
    }
}

#[test]
fn key_exchange_without_token_field_is_rejected() {
    let body = json!({ "status": "ok", "data": { "user": "x" } });
    assert!(normalize_key_exchange(&body, ResponseShapes::Legacy).is_none());
}

#[test]
fn strict_token_lookup_ignores_legacy_fields() {
    let body = json!({ "data": { "token": "nested" } });
    assert!(normalize_key_exchange(&body, ResponseShapes::Strict).is_none());
    let body = json!({ "token": "flat" });
    assert_eq!(
        normalize_key_exchange(&body, ResponseShapes::Strict)
            .expect("token")
            .expose(),
        "flat"
    );
}

#[test]
fn chat_reply_reads_nested_response_and_identifiers() {
    let body = json!({
        "data": { "response": "hello", "session_uuid": "abc", "user_uuid": "u-9" }
    });
    let reply = normalize_chat_reply(&body, ResponseShapes::Strict).expect("reply");
    assert_eq!(reply.text, "hello");
    assert_eq!(reply.session_uuid, Some(SessionUuid("abc".to_string())));
    assert_eq!(reply.user_uuid, Some(UserUuid("u-9".to_string())));
}

#[test]
fn legacy_chat_reply_falls_back_through_fields_then_raw_json() {
    let body = json!({ "response": "top-level" });
    assert_eq!(
        normalize_chat_reply(&body, ResponseShapes::Legacy)
            .expect("reply")
            .text,
        "top-level"
    );

    let body = json!({ "message": "from message" });
    assert_eq!(
        normalize_chat_reply(&body, ResponseShapes::Legacy)
            .expect("reply")
            .text,
        "from message"
    );

    let body = json!({ "unexpected": 1 });
    let reply = normalize_chat_reply(&body, ResponseShapes::Legacy).expect("reply");
    assert_eq!(reply.text, r#"{"unexpected":1}"#);
    assert!(reply.session_uuid.is_none());
}

#[test]
fn strict_chat_reply_requires_nested_response() {
    let body = json!({ "response": "top-level" });
    assert!(normalize_chat_reply(&body, ResponseShapes::Strict).is_none());
}

#[test]
fn server_error_body_tolerates_garbage() {
    assert_eq!(
        crate::error::ServerErrorBody::from_bytes(br#"{"message":"bad key"}"#).message(),
        Some("bad key")
    );
    assert_eq!(
        crate::error::ServerErrorBody::from_bytes(b"<html>oops</html>").message(),
        None
    );
    assert_eq!(
        crate::error::ServerErrorBody::from_bytes(br#"{"message":""}"#).message(),
        None
    );
    assert_eq!(
        crate::error::ServerErrorBody::from_bytes(br#"{"message":"  \n "}"#).message(),
        None
    );
}

#[test]
fn server_error_message_is_kept_verbatim() {
    let body = crate::error::ServerErrorBody::from_bytes(br#"{"message":"  key revoked\n"}"#);
    assert_eq!(body.message(), Some("  key revoked\n"));
}
