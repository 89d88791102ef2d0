use super::*;

#[test]
fn plain_text_is_a_message() {
    assert_eq!(parse_input("  deploy my app "), Input::Message("deploy my app".to_owned()));
}

#[test]
fn blank_lines_are_ignored() {
    assert_eq!(parse_input("   "), Input::Empty);
    assert_eq!(parse_input(""), Input::Empty);
}

#[test]
fn slash_commands_parse() {
    assert_eq!(parse_input("/quit"), Input::Quit);
    assert_eq!(parse_input("/exit"), Input::Quit);
    assert_eq!(parse_input("/help"), Input::Help);
    assert_eq!(parse_input("/status"), Input::Status);
    assert_eq!(parse_input("/agent recon"), Input::SwitchAgent("recon".to_owned()));
}

#[test]
fn agent_without_id_is_unknown() {
    assert_eq!(parse_input("/agent"), Input::Unknown("/agent".to_owned()));
    assert_eq!(parse_input("/dance"), Input::Unknown("/dance".to_owned()));
}

#[test]
fn view_folds_stream_into_one_message() {
    let view = TerminalView::new();
    view.push_user(ChatMessage::new("u1", Role::User, "hi", 1));
    view.on_stream_start("s1", "recon");
    view.on_stream_chunk("s1", "Hello ");
    view.on_stream_chunk("s1", "world");
    view.on_stream_end("s1", "recon");

    let messages = view.snapshot();
    assert_eq!(messages.len(), 2);
    let reply = messages.iter().find(|m| m.id == "s1").expect("streamed reply");
    assert_eq!(reply.content, "Hello world");
    assert!(!reply.is_streaming());
}

#[test]
fn view_records_errors_and_responses() {
    let view = TerminalView::new();
    view.on_response(ChatMessage::new("m1", Role::Assistant, "done", 5).with_agent("recon", None));
    view.on_error("throttled");

    let messages = view.snapshot();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().any(|m| m.is_error() && m.content == "throttled"));
    assert!(messages.iter().any(|m| m.id.starts_with("err-")));
}

#[test]
fn push_user_returns_history_including_turn() {
    let view = TerminalView::new();
    let first = view.push_user(ChatMessage::new("u1", Role::User, "one", 1));
    let second = view.push_user(ChatMessage::new("u2", Role::User, "two", 2));
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
    assert_eq!(second[1].content, "two");
}

#[test]
fn help_lists_every_command() {
    for command in ["/agent", "/status", "/help", "/quit", "/exit"] {
        assert!(HELP.contains(command), "help is missing {command}");
        assert_ne!(parse_input(command), Input::Unknown(command.to_owned()), "{command}");
    }
}

#[test]
fn push_user_bounds_history_to_context_window() {
    let view = TerminalView::new();
    let mut history = Vec::new();
    for n in 0..=transcript::MAX_CONTEXT {
        let stamp = i64::try_from(n).expect("small index");
        history = view.push_user(ChatMessage::new(format!("u{n}"), Role::User, "hi", stamp));
    }
    assert_eq!(history.len(), transcript::WINDOW_SIZE);
    assert_eq!(
        history.last().expect("latest turn").id,
        format!("u{}", transcript::MAX_CONTEXT)
    );
    assert_eq!(view.snapshot().len(), transcript::MAX_CONTEXT + 1);
}

#[test]
fn error_mid_stream_closes_the_stream() {
    let view = TerminalView::new();
    view.on_stream_start("s1", "recon");
    view.on_stream_chunk("s1", "partial");
    view.on_error("connection lost");

    assert_eq!(view.lock().streaming_id(), None);
    let messages = view.snapshot();
    assert!(messages.iter().any(|m| m.is_error() && m.content == "connection lost"));
}
