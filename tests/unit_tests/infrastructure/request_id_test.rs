use krishi_chat::infrastructure::observability::{REQUEST_ID_HEADER, RequestId};

#[test]
fn given_generated_ids_when_compared_then_unique_uuids() {
    let first = RequestId::generate();
    let second = RequestId::generate();

    assert_ne!(first, second);
    assert!(uuid::Uuid::parse_str(first.as_str()).is_ok());
}

#[test]
fn given_header_name_when_used_then_is_lowercase_x_request_id() {
    assert_eq!(REQUEST_ID_HEADER, "x-request-id");
}
