use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const LIKE_OF: &str = "like-of";
pub const MENTION_OF: &str = "mention-of";
pub const IN_REPLY_TO: &str = "in-reply-to";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MentionContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    // html, value and anything else the service adds
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One child of a jf2 mentions feed.
///
/// Only the fields the pipeline inspects are typed; every other field is kept
/// in `extra` and written back to the cache untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Mention {
    #[serde(rename = "wm-id", default, skip_serializing_if = "Option::is_none")]
    pub wm_id: Option<u64>,
    #[serde(rename = "wm-property", default)]
    pub wm_property: String,
    #[serde(rename = "wm-target", default)]
    pub wm_target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MentionContent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mention {
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.text.as_deref())
    }
}

/// Response body of the mentions.jf2 endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MentionFeed {
    #[serde(default, deserialize_with = "lenient_mentions")]
    pub children: Vec<Mention>,
}

/// Persisted state in `webmentions.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CacheSnapshot {
    #[serde(rename = "lastFetched", default)]
    pub last_fetched: Option<String>,
    #[serde(default, deserialize_with = "lenient_mentions")]
    pub children: Vec<Mention>,
}

/// Decodes each child on its own so one malformed record only loses itself.
/// A missing or null list is empty.
fn lenient_mentions<'de, D>(deserializer: D) -> Result<Vec<Mention>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Mention>(value) {
            Ok(mention) => Some(mention),
            Err(e) => {
                warn!("Dropping malformed webmention: {}", e);
                None
            }
        })
        .collect())
}
