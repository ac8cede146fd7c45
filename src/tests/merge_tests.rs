use crate::mention_cache::merge_mentions;
use crate::models::Mention;
use serde_json::json;

fn like(id: u64, source: &str) -> Mention {
    serde_json::from_value(json!({
        "wm-id": id,
        "wm-property": "like-of",
        "wm-target": "https://x/a",
        "wm-source": source,
    }))
    .unwrap()
}

fn source_of(mention: &Mention) -> &str {
    mention.extra["wm-source"].as_str().unwrap()
}

#[test]
fn test_fresh_record_wins_on_same_id() {
    let cached = vec![like(1, "cached")];
    let fresh = vec![like(1, "fresh")];

    let merged = merge_mentions(cached, fresh);
    assert_eq!(merged.len(), 1);
    assert_eq!(source_of(&merged[0]), "fresh");
}

#[test]
fn test_merged_ids_are_unique() {
    let cached = vec![like(1, "a"), like(2, "a"), like(2, "b")];
    let fresh = vec![like(2, "c"), like(3, "c"), like(1, "c"), like(3, "d")];

    let merged = merge_mentions(cached, fresh);
    let mut ids: Vec<u64> = merged.iter().filter_map(|m| m.wm_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), merged.len());
    assert_eq!(merged.len(), 3);
}

#[test]
fn test_order_is_cached_then_new_fresh() {
    let cached = vec![like(10, "cached"), like(20, "cached")];
    let fresh = vec![like(30, "fresh"), like(10, "fresh"), like(5, "fresh")];

    let merged = merge_mentions(cached, fresh);
    let order: Vec<(u64, &str)> = merged
        .iter()
        .map(|m| (m.wm_id.unwrap(), source_of(m)))
        .collect();
    assert_eq!(
        order,
        vec![(10, "fresh"), (20, "cached"), (30, "fresh"), (5, "fresh")]
    );
}

#[test]
fn test_mentions_without_id_are_dropped() {
    let no_id: Mention = serde_json::from_value(json!({
        "wm-property": "like-of",
        "wm-target": "https://x/a",
    }))
    .unwrap();

    let merged = merge_mentions(vec![no_id.clone(), like(1, "cached")], vec![no_id]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].wm_id, Some(1));
}

#[test]
fn test_merge_with_empty_sides() {
    assert!(merge_mentions(vec![], vec![]).is_empty());
    assert_eq!(merge_mentions(vec![like(1, "a")], vec![]).len(), 1);
    assert_eq!(merge_mentions(vec![], vec![like(1, "a")]).len(), 1);
}

#[test]
fn test_sequential_merges_match_nested_merge() {
    let a = vec![like(1, "a"), like(2, "a")];
    let b = vec![like(2, "b"), like(3, "b")];
    let c = vec![like(3, "c"), like(1, "c"), like(4, "c")];

    let sequential = merge_mentions(merge_mentions(a.clone(), b.clone()), c.clone());
    let nested = merge_mentions(a, merge_mentions(b, c));
    assert_eq!(sequential, nested);

    let sources: Vec<&str> = sequential.iter().map(source_of).collect();
    assert_eq!(sources, vec!["c", "b", "c", "c"]);
}

#[test]
fn test_zero_id_is_treated_as_missing() {
    let zero: Mention = serde_json::from_value(json!({
        "wm-id": 0,
        "wm-property": "like-of",
        "wm-target": "https://x/a",
    }))
    .unwrap();

    let merged = merge_mentions(vec![zero.clone(), like(1, "cached")], vec![zero]);
    let ids: Vec<Option<u64>> = merged.iter().map(|m| m.wm_id).collect();
    assert_eq!(ids, vec![Some(1)]);
}
