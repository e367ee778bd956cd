use serde_json::json;

use krishi_chat::domain::YoutubeVideo;

#[test]
fn given_full_descriptor_when_decoding_then_reads_every_field() {
    let video = YoutubeVideo::from_value(&json!({
        "title": "Soil testing at home",
        "url": "https://youtu.be/abc",
        "thumbnail": "https://i.ytimg.com/abc.jpg",
        "duration": "12:04",
        "channel": "Krishi Darshan",
        "channel_url": "https://youtube.com/@krishi",
        "views": "1,204",
        "published": "2 years ago"
    }))
    .unwrap();

    assert_eq!(video.duration.as_deref(), Some("12:04"));
    assert_eq!(video.views, Some(1204));
    assert_eq!(video.channel.as_deref(), Some("Krishi Darshan"));
}

#[test]
fn given_numeric_duration_when_decoding_then_formats_minutes_and_seconds() {
    let video = YoutubeVideo::from_value(&json!({ "url": "https://youtu.be/x", "duration": 272 })).unwrap();
    assert_eq!(video.duration.as_deref(), Some("4:32"));
}

#[test]
fn given_descriptor_without_url_when_decoding_then_skipped() {
    assert!(YoutubeVideo::from_value(&json!({ "title": "No link" })).is_none());
}
