use crate::models::{Mention, IN_REPLY_TO, LIKE_OF, MENTION_OF};

/// Mention types rendered on pages; everything else (reposts, bookmarks, rsvps) is dropped.
pub const ACCEPTED_PROPERTIES: [&str; 3] = [LIKE_OF, MENTION_OF, IN_REPLY_TO];

pub fn is_accepted(mention: &Mention) -> bool {
    let property = mention.wm_property.as_str();
    if !ACCEPTED_PROPERTIES.contains(&property) {
        return false;
    }

    // Replies and mentions are only worth showing with a body
    if property == MENTION_OF || property == IN_REPLY_TO {
        return mention.text().is_some_and(|text| !text.is_empty());
    }

    true
}

/// Keeps accepted mentions, preserving their order.
pub fn filter_mentions(mentions: Vec<Mention>) -> Vec<Mention> {
    mentions.into_iter().filter(is_accepted).collect()
}
