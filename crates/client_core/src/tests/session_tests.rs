use super::*;

fn reply(session: Option<&str>, user: Option<&str>) -> ChatReply {
    ChatReply {
        text: "ok".to_string(),
        session_uuid: session.map(|s| SessionUuid(s.to_string())),
        user_uuid: user.map(|u| UserUuid(u.to_string())),
    }
}

fn authenticated() -> SessionState {
    let mut state = SessionState::default();
    state.authenticate(AuthToken::new("tok"));
    state
}

#[test]
fn default_state_is_unauthenticated_and_rejects_chat() {
    let state = SessionState::default();
    assert_eq!(state.phase(), SessionPhase::Unauthenticated);
    assert_eq!(
        state.chat_request("hi", "m", "p").unwrap_err(),
        ClientError::NotAuthenticated
    );
}

#[test]
fn authenticate_drops_previous_conversation() {
    let mut state = authenticated();
    state.record_identifiers(&reply(Some("abc"), Some("u1")));
    assert_eq!(state.phase(), SessionPhase::InSession);

    state.authenticate(AuthToken::new("fresh"));
    assert_eq!(state.phase(), SessionPhase::Authenticated);
    assert!(state.session_uuid.is_none());
    assert!(state.user_uuid.is_none());
    assert_eq!(state.auth_token.as_ref().map(AuthToken::expose), Some("fresh"));
}

#[test]
fn first_assigned_identifiers_win() {
    let mut state = authenticated();
    state.record_identifiers(&reply(Some("abc"), None));
    state.record_identifiers(&reply(Some("other"), Some("u1")));

    assert_eq!(state.session_uuid, Some(SessionUuid("abc".to_string())));
    assert_eq!(state.user_uuid, Some(UserUuid("u1".to_string())));
}

#[test]
fn chat_request_forwards_held_identifiers() {
    let mut state = authenticated();
    state.record_identifiers(&reply(Some("abc"), Some("u1")));

    let (token, request) = state
        .chat_request("hello", "gpt-4o-mini", "CHATGPT")
        .expect("request");
    assert_eq!(token.expose(), "tok");
    assert_eq!(request.prompt, "hello");
    assert_eq!(request.session_uuid, Some(SessionUuid("abc".to_string())));
    assert_eq!(request.user_uuid, Some(UserUuid("u1".to_string())));
}

#[test]
fn clear_conversation_keeps_token_but_clear_drops_everything() {
    let mut state = authenticated();
    state.record_identifiers(&reply(Some("abc"), Some("u1")));

    state.clear_conversation();
    assert_eq!(state.phase(), SessionPhase::Authenticated);
    assert!(state.auth_token.is_some());

    state.record_identifiers(&reply(Some("abc"), None));
    state.clear();
    assert_eq!(state, SessionState::default());
}
