//! Tests for the persistence layer: ownership checks, pagination, round-trips

use std::sync::Arc;
use std::time::Duration;

use studio_gateway::storage::memory::{MemoryObjectStore, MemoryRecordStore};
use studio_gateway::storage::model::NewGeneration;
use studio_gateway::storage::GalleryStore;
use studio_gateway::AppError;

fn new_generation(user_id: &str, prompt: &str) -> NewGeneration {
    NewGeneration {
        user_id: user_id.to_string(),
        user_email: format!("{}@example.com", user_id),
        prompt: prompt.to_string(),
        enhanced_prompt: None,
        image_model: "titan-g1".to_string(),
        llm_model: "claude".to_string(),
        character_data: None,
    }
}

fn gallery_with_objects() -> (GalleryStore, Arc<MemoryObjectStore>) {
    let objects = Arc::new(MemoryObjectStore::new());
    let gallery = GalleryStore::new(Arc::new(MemoryRecordStore::new()), objects.clone());
    (gallery, objects)
}

#[tokio::test]
async fn test_store_then_fetch_round_trip() {
    let (gallery, objects) = gallery_with_objects();

    let stored = gallery
        .store(new_generation("user-1", "a red fox"), b"image-bytes".to_vec())
        .await
        .unwrap();

    let fetched = gallery
        .fetch_by_id(&stored.generation_id.to_string())
        .await
        .unwrap();

    assert_eq!(fetched.generation_id, stored.generation_id);
    assert_eq!(fetched.user_id, "user-1");
    assert_eq!(fetched.user_email, "user-1@example.com");
    assert_eq!(fetched.prompt, "a red fox");
    assert_eq!(fetched.image_model, "titan-g1");
    assert_eq!(fetched.llm_model, "claude");
    assert!(!fetched.is_public, "visibility must default to private");
    assert_eq!(fetched.created_at, fetched.updated_at);

    // Bytes went to the object store under the owner-namespaced key.
    assert!(fetched.image_key.starts_with("generations/user-1/"));
    assert!(objects.contains(&fetched.image_key));
}

#[tokio::test]
async fn test_fetch_unknown_id_is_not_found() {
    let (gallery, _) = gallery_with_objects();
    let err = gallery.fetch_by_id("no-such-generation").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_by_owner_removes_record_and_bytes() {
    let (gallery, objects) = gallery_with_objects();
    let stored = gallery
        .store(new_generation("user-1", "a red fox"), b"image-bytes".to_vec())
        .await
        .unwrap();
    let id = stored.generation_id.to_string();

    gallery.delete(&id, "user-1").await.unwrap();

    assert!(matches!(gallery.fetch_by_id(&id).await.unwrap_err(), AppError::NotFound(_)));
    assert!(!objects.contains(&stored.image_key));
}

#[tokio::test]
async fn test_delete_by_non_owner_mutates_nothing() {
    let (gallery, objects) = gallery_with_objects();
    let stored = gallery
        .store(new_generation("user-1", "a red fox"), b"image-bytes".to_vec())
        .await
        .unwrap();
    let id = stored.generation_id.to_string();

    let err = gallery.delete(&id, "user-2").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    // Neither metadata nor bytes were touched.
    assert!(gallery.fetch_by_id(&id).await.is_ok());
    assert!(objects.contains(&stored.image_key));
}

#[tokio::test]
async fn test_delete_unknown_id_is_not_found() {
    let (gallery, _) = gallery_with_objects();
    let err = gallery.delete("no-such-generation", "user-1").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_set_visibility_updates_flag_and_timestamp_together() {
    let (gallery, _) = gallery_with_objects();
    let stored = gallery
        .store(new_generation("user-1", "a red fox"), b"image-bytes".to_vec())
        .await
        .unwrap();
    let id = stored.generation_id.to_string();

    tokio::time::sleep(Duration::from_millis(5)).await;
    gallery.set_visibility(&id, "user-1", true).await.unwrap();

    let fetched = gallery.fetch_by_id(&id).await.unwrap();
    assert!(fetched.is_public);
    assert!(fetched.updated_at > fetched.created_at);
    assert_eq!(fetched.created_at, stored.created_at);

    gallery.set_visibility(&id, "user-1", false).await.unwrap();
    assert!(!gallery.fetch_by_id(&id).await.unwrap().is_public);
}

#[tokio::test]
async fn test_set_visibility_by_non_owner_mutates_nothing() {
    let (gallery, _) = gallery_with_objects();
    let stored = gallery
        .store(new_generation("user-1", "a red fox"), b"image-bytes".to_vec())
        .await
        .unwrap();
    let id = stored.generation_id.to_string();

    let err = gallery.set_visibility(&id, "user-2", true).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    let fetched = gallery.fetch_by_id(&id).await.unwrap();
    assert!(!fetched.is_public);
    assert_eq!(fetched.updated_at, stored.updated_at);
}

#[tokio::test]
async fn test_count_by_owner() {
    let (gallery, _) = gallery_with_objects();
    for i in 0..3 {
        gallery
            .store(new_generation("user-1", &format!("prompt {}", i)), vec![i])
            .await
            .unwrap();
    }
    gallery
        .store(new_generation("user-2", "other"), vec![9])
        .await
        .unwrap();

    assert_eq!(gallery.count_by_owner("user-1").await.unwrap(), 3);
    assert_eq!(gallery.count_by_owner("user-2").await.unwrap(), 1);
    assert_eq!(gallery.count_by_owner("user-3").await.unwrap(), 0);
}

#[tokio::test]
async fn test_pagination_yields_disjoint_pages_in_newest_first_order() {
    let (gallery, _) = gallery_with_objects();

    let mut ids = Vec::new();
    for i in 0..5 {
        let stored = gallery
            .store(new_generation("user-1", &format!("prompt {}", i)), vec![i])
            .await
            .unwrap();
        ids.push(stored.generation_id);
        // Distinct creation timestamps keep the expected ordering unambiguous.
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    // Another owner's records must never leak into the pages.
    gallery
        .store(new_generation("user-2", "other"), vec![9])
        .await
        .unwrap();

    let mut collected = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = gallery
            .list_by_owner("user-1", 2, cursor.as_deref())
            .await
            .unwrap();
        assert!(page.records.len() <= 2);
        collected.extend(page.records.iter().map(|r| r.generation_id));
        pages += 1;
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    // Concatenated pages equal the full newest-first ordering, no overlaps.
    let expected: Vec<_> = ids.iter().rev().copied().collect();
    assert_eq!(collected, expected);
}
