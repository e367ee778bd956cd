use serde::Serialize;
use serde_json::Value;

/// Typed view over one entry of the `youtube` metadata list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct YoutubeVideo {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub channel: Option<String>,
    pub channel_url: Option<String>,
    pub views: Option<u64>,
    pub published: Option<String>,
}

impl YoutubeVideo {
    /// Lenient decode: only `url` is required.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let url = fields.get("url").and_then(Value::as_str)?.to_string();
        let text = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            title: text("title").unwrap_or_default(),
            url,
            thumbnail: text("thumbnail"),
            duration: fields.get("duration").and_then(format_duration),
            channel: text("channel"),
            channel_url: text("channel_url"),
            views: fields.get("views").and_then(|v| {
                v.as_u64()
                    .or_else(|| v.as_str().and_then(|s| s.replace(',', "").parse().ok()))
            }),
            published: text("published"),
        })
    }
}

fn format_duration(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => {
            let seconds = n.as_f64()? as u64;
            if seconds == 0 {
                return None;
            }
            Some(format!("{}:{:02}", seconds / 60, seconds % 60))
        }
        _ => None,
    }
}
