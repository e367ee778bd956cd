use std::path::PathBuf;

use krishi_chat::presentation::cli::ReplCommand;

#[test]
fn given_plain_text_when_parsing_then_send() {
    assert_eq!(
        ReplCommand::parse("  what about zinc deficiency? "),
        Ok(ReplCommand::Send("what about zinc deficiency?".to_string()))
    );
}

#[test]
fn given_image_command_when_parsing_then_keeps_path_with_spaces() {
    assert_eq!(
        ReplCommand::parse("/image photos/leaf spot.jpg"),
        Ok(ReplCommand::Image(PathBuf::from("photos/leaf spot.jpg")))
    );
    assert!(ReplCommand::parse("/image").is_err());
}

#[test]
fn given_open_command_when_parsing_then_requires_numeric_id() {
    assert_eq!(ReplCommand::parse("/open 42"), Ok(ReplCommand::Open(42)));
    assert!(ReplCommand::parse("/open abc").is_err());
}

#[test]
fn given_simple_commands_when_parsing_then_recognized() {
    assert_eq!(ReplCommand::parse("/retry"), Ok(ReplCommand::Retry));
    assert_eq!(ReplCommand::parse("/dismiss"), Ok(ReplCommand::Dismiss));
    assert_eq!(ReplCommand::parse("/new"), Ok(ReplCommand::New));
    assert_eq!(ReplCommand::parse("/noimage"), Ok(ReplCommand::NoImage));
    assert_eq!(ReplCommand::parse("/exit"), Ok(ReplCommand::Quit));
}

#[test]
fn given_unknown_command_when_parsing_then_error_mentions_help() {
    let error = ReplCommand::parse("/frobnicate").unwrap_err();
    assert!(error.contains("/help"));
}
