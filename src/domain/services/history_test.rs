use anyhow::Result;
use tempfile::tempdir;
use test_utils::png_fixture;

use super::History;
use crate::domain::models::GeneratedImage;
use crate::domain::models::ImageBlob;
use crate::domain::services::codec;

const NO_QUOTA: usize = usize::MAX;

fn image(id: &str, bytes: Vec<u8>) -> GeneratedImage {
    let blob = ImageBlob::new(bytes, "image/png");
    return GeneratedImage {
        id: id.to_string(),
        url: codec::data_url(&blob),
        blob,
        prompt: "a red fox".to_string(),
    };
}

fn fixed_size_images(count: usize) -> Vec<GeneratedImage> {
    return (0..count)
        .map(|idx| {
            return image(&idx.to_string(), vec![idx as u8; 100]);
        })
        .collect::<Vec<GeneratedImage>>();
}

#[tokio::test]
async fn it_round_trips_history_byte_for_byte() {
    let dir = tempdir().unwrap();
    let store = History::new(dir.path().join("history.json"), 8, NO_QUOTA);

    let original = image("1700000000000", png_fixture());
    store.save(&[original.clone()]).await;

    let loaded = store.load().await;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, original.id);
    assert_eq!(loaded[0].prompt, original.prompt);
    assert_eq!(loaded[0].blob, original.blob);
    assert_eq!(loaded[0].url, codec::data_url(&original.blob));
}

#[tokio::test]
async fn it_truncates_to_the_configured_limit() {
    let dir = tempdir().unwrap();
    let store = History::new(dir.path().join("history.json"), 3, NO_QUOTA);

    store.save(&fixed_size_images(5)).await;

    let loaded = store.load().await;
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded[0].id, "0");
    assert_eq!(loaded[2].id, "2");
}

#[tokio::test]
async fn it_returns_empty_history_when_nothing_was_saved() {
    let dir = tempdir().unwrap();
    let store = History::new(dir.path().join("history.json"), 8, NO_QUOTA);

    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn it_evicts_oldest_entries_until_the_document_fits() -> Result<()> {
    let dir = tempdir().unwrap();
    let images = fixed_size_images(4);

    // Measure how many bytes a two entry document takes, then use that as
    // the quota for a four entry save.
    let sizing = History::new(dir.path().join("sizing.json"), 8, NO_QUOTA);
    sizing.save(&images[..2]).await;
    let two_entry_len = std::fs::metadata(dir.path().join("sizing.json"))?.len() as usize;

    let store = History::new(dir.path().join("history.json"), 8, two_entry_len);
    store.save(&images).await;

    let loaded = store.load().await;
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, "0");
    assert_eq!(loaded[1].id, "1");
    return Ok(());
}

#[tokio::test]
async fn it_clears_the_store_when_not_even_one_entry_fits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");

    let store = History::new(path.clone(), 8, NO_QUOTA);
    store.save(&fixed_size_images(2)).await;
    assert!(path.exists());

    let tiny = History::new(path.clone(), 8, 5);
    tiny.save(&fixed_size_images(2)).await;

    assert!(!path.exists());
    assert!(tiny.load().await.is_empty());
}

#[tokio::test]
async fn it_drops_only_the_undecodable_entry() -> Result<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");

    let payload = concat!(
        r#"[{"id":"1","prompt":"first","base64":"AQID","mimeType":"image/png"},"#,
        r#"{"id":"2","prompt":"broken","base64":"!!not-base64!!","mimeType":"image/png"},"#,
        r#"{"id":"3","prompt":"third","base64":"AQID","mimeType":"image/png"}]"#
    );
    std::fs::write(&path, payload)?;

    let store = History::new(path, 8, NO_QUOTA);
    let loaded = store.load().await;

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, "1");
    assert_eq!(loaded[1].id, "3");
    assert_eq!(loaded[0].blob.bytes, vec![1, 2, 3]);
    return Ok(());
}

#[tokio::test]
async fn it_discards_a_corrupt_document_and_self_heals() -> Result<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{{ definitely not json")?;

    let store = History::new(path.clone(), 8, NO_QUOTA);

    assert!(store.load().await.is_empty());
    assert!(!path.exists());
    return Ok(());
}
