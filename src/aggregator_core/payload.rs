//! Post payload decoding
//!
//! Payloads are status objects in the classic streaming format. An object
//! carrying a top-level `delete` key is a tombstone; anything else is a
//! content post. Attributes are pulled out one by one so a single missing or
//! mistyped field never rejects the whole entry.

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PostEvent {
    Tombstone,
    Content(ContentPost),
}

/// Attribute values extracted from a content post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPost {
    pub language: Option<String>,
    pub hashtags: Vec<String>,
    pub urls: Vec<String>,
    pub media_types: Vec<String>,
    pub mentions: Vec<String>,
    pub reshare_count: u64,
}

impl ContentPost {
    pub fn has_photo(&self) -> bool {
        self.media_types.iter().any(|t| t == "photo")
    }

    pub fn is_reshared(&self) -> bool {
        self.reshare_count > 0
    }
}

#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    NotAnObject,
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json(err)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Json(e) => write!(f, "Invalid JSON payload: {}", e),
            DecodeError::NotAnObject => write!(f, "Payload is not a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Json(e) => Some(e),
            DecodeError::NotAnObject => None,
        }
    }
}

impl PostEvent {
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(payload)?;
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

        if object.contains_key("delete") {
            return Ok(PostEvent::Tombstone);
        }

        let entities = object.get("entities");

        let language = match object.get("lang") {
            Some(Value::String(lang)) => Some(lang.clone()),
            Some(Value::Null) | None => None,
            Some(other) => {
                log::debug!("Ignoring non-string lang field: {}", other);
                None
            }
        };

        let urls = array_at(entities, "urls")
            .filter_map(|url| {
                url.get("expanded_url")
                    .and_then(Value::as_str)
                    .or_else(|| url.get("url").and_then(Value::as_str))
                    .map(str::to_string)
            })
            .collect();

        let media_types = array_at(object.get("extended_entities"), "media")
            .filter_map(|medium| medium.get("type").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let reshare_count = object
            .get("retweet_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(PostEvent::Content(ContentPost {
            language,
            hashtags: strings_at(entities, "hashtags", "text"),
            urls,
            media_types,
            mentions: strings_at(entities, "user_mentions", "screen_name"),
            reshare_count,
        }))
    }
}

/// Items of `parent[key]` when it is an array, otherwise nothing
fn array_at<'a>(parent: Option<&'a Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    parent
        .and_then(|p| p.get(key))
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

fn strings_at(parent: Option<&Value>, key: &str, field: &str) -> Vec<String> {
    array_at(parent, key)
        .filter_map(|item| match item.get(field).and_then(Value::as_str) {
            Some(text) => Some(text.to_string()),
            None => {
                log::debug!("Skipping {} entry without string '{}'", key, field);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tombstone() {
        let line = r#"{"delete":{"status":{"id":1,"user_id":2},"timestamp_ms":"1"}}"#;
        assert_eq!(PostEvent::decode(line).unwrap(), PostEvent::Tombstone);
    }

    #[test]
    fn test_decode_full_content_post() {
        let line = r#"{
            "lang": "en",
            "retweet_count": 4,
            "entities": {
                "hashtags": [{"text": "rust"}, {"text": "async"}],
                "urls": [{"url": "https://t.co/x", "expanded_url": "https://blog.rust-lang.org/post"}],
                "user_mentions": [{"screen_name": "ferris"}]
            },
            "extended_entities": {"media": [{"type": "video"}, {"type": "photo"}]}
        }"#;

        let PostEvent::Content(post) = PostEvent::decode(line).unwrap() else {
            panic!("expected content post");
        };
        assert_eq!(post.language.as_deref(), Some("en"));
        assert_eq!(post.hashtags, vec!["rust", "async"]);
        assert_eq!(post.urls, vec!["https://blog.rust-lang.org/post"]);
        assert_eq!(post.mentions, vec!["ferris"]);
        assert!(post.has_photo());
        assert!(post.is_reshared());
    }

    #[test]
    fn test_missing_attributes_are_skipped() {
        let line = r#"{"text":"hello","entities":{"hashtags":[{"indices":[0,1]},{"text":"ok"}],"urls":"oops"}}"#;

        let PostEvent::Content(post) = PostEvent::decode(line).unwrap() else {
            panic!("expected content post");
        };
        assert_eq!(post.language, None);
        assert_eq!(post.hashtags, vec!["ok"]);
        assert!(post.urls.is_empty());
        assert!(!post.has_photo());
        assert!(!post.is_reshared());
    }

    #[test]
    fn test_url_falls_back_to_short_link() {
        let line = r#"{"entities":{"urls":[{"url":"https://t.co/abc"}]}}"#;

        let PostEvent::Content(post) = PostEvent::decode(line).unwrap() else {
            panic!("expected content post");
        };
        assert_eq!(post.urls, vec!["https://t.co/abc"]);
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(PostEvent::decode(r#"{"lang": "en"#), Err(DecodeError::Json(_))));
        assert!(matches!(PostEvent::decode("[1,2,3]"), Err(DecodeError::NotAnObject)));
    }
}
