use krishi_chat::domain::{Conversation, ConversationId};

#[test]
fn given_long_first_message_when_deriving_title_then_keeps_first_twenty_chars() {
    let title = Conversation::derive_title("How do I treat leaf rust on wheat?", 20);
    assert_eq!(title, "How do I treat leaf ");
}

#[test]
fn given_short_message_when_deriving_title_then_uses_whole_message() {
    assert_eq!(Conversation::derive_title("  Hello  ", 20), "Hello");
}

#[test]
fn given_image_only_message_when_deriving_title_then_uses_image_label() {
    assert_eq!(Conversation::derive_title("   ", 20), "Image message");
}

#[test]
fn given_multibyte_text_when_deriving_title_then_counts_characters() {
    let title = Conversation::derive_title("गेहूं में पीला रतुआ रोग का इलाज क्या है", 5);
    assert_eq!(title.chars().count(), 5);
}

#[test]
fn given_default_conversation_id_when_checking_then_is_transient() {
    assert!(ConversationId::default().is_transient());
    assert_eq!(ConversationId::default(), ConversationId::TRANSIENT);
    assert!(!ConversationId::new(42).is_transient());
}
