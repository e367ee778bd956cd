use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::YoutubeVideo;

pub const URLS_KEY: &str = "urls";
pub const YOUTUBE_KEY: &str = "youtube";

const LEGACY_URL_KEY: &str = "url";
const LEGACY_YOUTUBE_RELATED_KEY: &str = "youtberelated";
const NESTED_YOUTUBE_URLS_KEY: &str = "youtube_urls";

/// Enrichment attached to an assistant message: citation links under `urls`
/// and video descriptors under `youtube`. Always held in canonical form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Folds legacy key shapes into `urls` / `youtube`. Non-object input
    /// yields empty metadata.
    pub fn normalize(raw: &Value) -> Self {
        match raw {
            Value::Object(map) => Self::from_map(map.clone()),
            _ => Self::empty(),
        }
    }

    pub fn from_map(mut map: Map<String, Value>) -> Self {
        if let Some(legacy) = map.remove(LEGACY_URL_KEY) {
            if !map.contains_key(URLS_KEY) {
                match legacy {
                    Value::Array(_) => {
                        map.insert(URLS_KEY.to_string(), legacy);
                    }
                    Value::String(url) => {
                        map.insert(URLS_KEY.to_string(), Value::Array(vec![Value::String(url)]));
                    }
                    _ => {}
                }
            }
        }

        let canonical = map.remove(YOUTUBE_KEY).and_then(video_list);
        let legacy = map.remove(LEGACY_YOUTUBE_RELATED_KEY).and_then(video_list);
        if let Some(videos) = canonical.or(legacy) {
            map.insert(YOUTUBE_KEY.to_string(), videos);
        }

        Self(map)
    }

    /// True when no key carries anything worth showing.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|value| match value {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        })
    }

    pub fn urls(&self) -> Vec<&str> {
        self.0
            .get(URLS_KEY)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn youtube(&self) -> Vec<YoutubeVideo> {
        self.0
            .get(YOUTUBE_KEY)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(YoutubeVideo::from_value).collect())
            .unwrap_or_default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

fn video_list(value: Value) -> Option<Value> {
    match value {
        Value::Array(_) => Some(value),
        Value::Object(mut nested) => match nested.remove(NESTED_YOUTUBE_URLS_KEY) {
            Some(list @ Value::Array(_)) => Some(list),
            _ => None,
        },
        _ => None,
    }
}
