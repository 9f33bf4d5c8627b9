//! Tests for the public listing assembler

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use studio_gateway::explore::ExploreFeed;
use studio_gateway::storage::memory::{MemoryObjectStore, MemoryRecordStore};
use studio_gateway::storage::model::{GenerationRecord, NewGeneration};
use studio_gateway::storage::record::RecordStore;
use studio_gateway::storage::GalleryStore;

fn new_generation(user_id: &str, image_model: &str, prompt: &str) -> NewGeneration {
    NewGeneration {
        user_id: user_id.to_string(),
        user_email: format!("{}@example.com", user_id),
        prompt: prompt.to_string(),
        enhanced_prompt: None,
        image_model: image_model.to_string(),
        llm_model: "claude".to_string(),
        character_data: None,
    }
}

fn harness() -> (Arc<MemoryRecordStore>, GalleryStore, ExploreFeed) {
    let records = Arc::new(MemoryRecordStore::new());
    let gallery = GalleryStore::new(records.clone(), Arc::new(MemoryObjectStore::new()));
    let feed = ExploreFeed::new(records.clone());
    (records, gallery, feed)
}

#[tokio::test]
async fn test_feed_contains_only_public_records() {
    let (_, gallery, feed) = harness();

    let public = gallery
        .store(new_generation("user-1", "titan-g1", "public one"), vec![1])
        .await
        .unwrap();
    gallery
        .store(new_generation("user-1", "titan-g1", "private one"), vec![2])
        .await
        .unwrap();
    gallery
        .set_visibility(&public.generation_id.to_string(), "user-1", true)
        .await
        .unwrap();

    let page = feed.list_public(50, None).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].generation_id, public.generation_id);
    assert!(page.message.is_none());
}

#[tokio::test]
async fn test_feed_excludes_edit_backend_even_when_public() {
    let (_, gallery, feed) = harness();

    let edit = gallery
        .store(new_generation("user-1", "flux-kontext-pro", "edited"), vec![1])
        .await
        .unwrap();
    gallery
        .set_visibility(&edit.generation_id.to_string(), "user-1", true)
        .await
        .unwrap();

    let kept = gallery
        .store(new_generation("user-1", "sdxl", "generated"), vec![2])
        .await
        .unwrap();
    gallery
        .set_visibility(&kept.generation_id.to_string(), "user-1", true)
        .await
        .unwrap();

    let page = feed.list_public(50, None).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].generation_id, kept.generation_id);
}

#[tokio::test]
async fn test_feed_is_sorted_newest_first() {
    let (_, gallery, feed) = harness();

    let mut ids = Vec::new();
    for (owner, prompt) in [("user-2", "first"), ("user-1", "second"), ("user-3", "third")] {
        let stored = gallery
            .store(new_generation(owner, "nova-canvas", prompt), vec![1])
            .await
            .unwrap();
        gallery
            .set_visibility(&stored.generation_id.to_string(), owner, true)
            .await
            .unwrap();
        ids.push(stored.generation_id);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let page = feed.list_public(50, None).await.unwrap();
    let listed: Vec<_> = page.records.iter().map(|r| r.generation_id).collect();
    let expected: Vec<_> = ids.iter().rev().copied().collect();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_denied_scan_degrades_to_empty_feed() {
    let (records, gallery, feed) = harness();

    let stored = gallery
        .store(new_generation("user-1", "titan-g1", "public"), vec![1])
        .await
        .unwrap();
    gallery
        .set_visibility(&stored.generation_id.to_string(), "user-1", true)
        .await
        .unwrap();

    records.deny_scans();

    let page = feed.list_public(50, None).await.unwrap();
    assert!(page.records.is_empty());
    assert!(page.next_cursor.is_none());
    assert!(page.message.is_some());
}

#[tokio::test]
async fn test_legacy_string_visibility_is_coerced_into_the_feed() {
    let (records, _, feed) = harness();

    // A record written by an older system that encoded the flag as a string.
    let legacy: GenerationRecord = serde_json::from_value(json!({
        "generation_id": "5d1ce264-9d58-4c9f-9a5e-7b6f0e9c3a21",
        "user_id": "user-1",
        "user_email": "user-1@example.com",
        "prompt": "legacy record",
        "image_model": "titan-g2",
        "llm_model": "claude",
        "image_url": "memory://generations/user-1/legacy.png",
        "image_key": "generations/user-1/legacy.png",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z",
        "status": "completed",
        "is_public": "true",
    }))
    .unwrap();
    records.put(&legacy).await.unwrap();

    let page = feed.list_public(50, None).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert!(page.records[0].is_public);
}
