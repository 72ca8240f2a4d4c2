use async_trait::async_trait;
use inline_images_block::{
    DocumentAssembler, ImageUploader, PendingUpload, RawRecord, SaveError, SavePolicy,
    UploadRequest, UploadedFile,
};
use poskas_atoms::content::{referenced_ids, Marks};
use poskas_atoms::media::{AssetId, ImageAsset, UrlNormalizer};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

/// Mock upload collaborator for testing
#[derive(Default)]
struct MockUploader {
    call_count: AtomicUsize,
    fail_names: Vec<String>,
    delays_ms: HashMap<String, u64>,
    completed: Mutex<Vec<String>>,
}

impl MockUploader {
    fn failing(names: &[&str]) -> Self {
        Self {
            fail_names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    fn with_delays(delays: &[(&str, u64)]) -> Self {
        Self {
            delays_ms: delays.iter().map(|(n, d)| (n.to_string(), *d)).collect(),
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageUploader for MockUploader {
    async fn upload(
        &self,
        upload_path: &str,
        request: UploadRequest<'_>,
    ) -> Result<UploadedFile, String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays_ms.get(request.filename) {
            tokio::time::sleep(Duration::from_millis(*delay)).await;
        }
        if self.fail_names.iter().any(|n| n == request.filename) {
            return Err("storage rejected the file".to_string());
        }
        if let Ok(mut completed) = self.completed.lock() {
            completed.push(request.filename.to_string());
        }

        let server_path = format!("/{}/{}-{}", upload_path, request.asset_id, request.filename);
        Ok(UploadedFile {
            url: format!("/api{}", server_path),
            server_path,
            filename: Some(request.filename.to_string()),
        })
    }
}

fn assembler(uploader: MockUploader) -> DocumentAssembler<Arc<MockUploader>> {
    DocumentAssembler::new(
        UrlNormalizer::new("http://host"),
        "uploads/poskas",
        Arc::new(uploader),
    )
}

fn hello_record() -> RawRecord {
    RawRecord::new("Hello [IMG:7] world", json!([{"id": 7, "url": "/uploads/x.jpg"}]))
}

fn ids(images: &[ImageAsset]) -> Vec<&str> {
    images.iter().map(|a| a.id.as_str()).collect()
}

#[tokio::test]
async fn test_edit_without_touching_images() {
    let uploader = Arc::new(MockUploader::default());
    let assembler = DocumentAssembler::new(
        UrlNormalizer::new("http://host"),
        "uploads/poskas",
        uploader.clone(),
    );

    let doc = assembler.load_for_editing(&hello_record());
    let outcome = assembler.prepare_for_save(doc, Vec::new()).await.unwrap();

    assert_eq!(ids(&outcome.record.images), vec!["7"]);
    assert_eq!(outcome.record.images[0].url, "http://host/uploads/x.jpg");
    assert_eq!(outcome.record.images[0].server_path.as_deref(), Some("/uploads/x.jpg"));
    assert_eq!(referenced_ids(&outcome.record.content), vec!["7"]);
    assert_eq!(outcome.record.content, "Hello [IMG:7] world");
    assert!(outcome.is_complete());
    assert_eq!(uploader.call_count(), 0);
}

#[tokio::test]
async fn test_image_removed_in_editor() {
    let assembler = assembler(MockUploader::default());

    let mut doc = assembler.load_for_editing(&hello_record());
    assert_eq!(doc.remove_image(&AssetId::new("7")), 1);
    let outcome = assembler.prepare_for_save(doc, Vec::new()).await.unwrap();

    assert!(outcome.record.images.is_empty());
    assert!(!outcome.record.content.contains("[IMG:7]"));
    assert_eq!(outcome.record.content, "Hello  world");
}

#[tokio::test]
async fn test_new_image_is_uploaded_and_appended() {
    let assembler = assembler(MockUploader::default());

    let mut doc = assembler.load_for_editing(&hello_record());
    let scan = PendingUpload::new("scan.png", "blob:http://localhost/scan", PNG.to_vec());
    doc.push_text(" and ", Marks::plain());
    doc.insert_image(scan.asset.clone());

    let new_id = scan.id().clone();
    let outcome = assembler.prepare_for_save(doc, vec![scan]).await.unwrap();

    assert_eq!(ids(&outcome.record.images), vec!["7", new_id.as_str()]);
    let uploaded = &outcome.record.images[1];
    let expected_path = format!("/uploads/poskas/{}-scan.png", new_id);
    assert_eq!(uploaded.server_path.as_deref(), Some(expected_path.as_str()));
    assert_eq!(uploaded.url, format!("http://host{}", expected_path));
    assert_eq!(uploaded.local_uri, None);
    assert_eq!(
        outcome.record.content,
        format!("Hello [IMG:7] world and [IMG:{}]", new_id)
    );
}

#[tokio::test]
async fn test_inserted_then_removed_image_is_not_uploaded() {
    let uploader = Arc::new(MockUploader::default());
    let assembler = DocumentAssembler::new(UrlNormalizer::new("http://host"), "uploads/poskas", uploader.clone());

    let mut doc = assembler.load_for_editing(&hello_record());
    let scan = PendingUpload::new("scan.png", "blob:scan", PNG.to_vec());
    doc.insert_image(scan.asset.clone());
    doc.remove_image(scan.id());

    let outcome = assembler.prepare_for_save(doc, vec![scan]).await.unwrap();

    assert_eq!(uploader.call_count(), 0);
    assert_eq!(ids(&outcome.record.images), vec!["7"]);
}

#[tokio::test]
async fn test_image_with_non_numeric_id_survives_save() {
    let uploader = Arc::new(MockUploader::default());
    let assembler = DocumentAssembler::new(UrlNormalizer::new("http://host"), "uploads/poskas", uploader.clone());

    let mut doc = assembler.load_for_editing(&RawRecord::default());
    doc.push_text("x ", Marks::plain());
    let id = doc.insert_image(ImageAsset::persisted("img-a", "a.jpg", "/uploads/a.jpg"));

    let outcome = assembler.prepare_for_save(doc, Vec::new()).await.unwrap();

    assert_eq!(outcome.record.content, format!("x [IMG:{}]", id));
    assert_eq!(ids(&outcome.record.images), vec![id.as_str()]);
    assert_eq!(outcome.record.images[0].server_path.as_deref(), Some("/uploads/a.jpg"));
    assert_eq!(uploader.call_count(), 0);
}

#[tokio::test]
async fn test_failed_upload_is_reported_and_left_out() {
    let assembler = assembler(MockUploader::failing(&["broken.png"]));

    let mut doc = assembler.load_for_editing(&hello_record());
    let good = PendingUpload::new("good.png", "blob:good", PNG.to_vec());
    let broken = PendingUpload::new("broken.png", "blob:broken", PNG.to_vec());
    doc.insert_image(broken.asset.clone());
    doc.insert_image(good.asset.clone());

    let broken_id = broken.id().clone();
    let good_id = good.id().clone();
    let outcome = assembler.prepare_for_save(doc, vec![broken, good]).await.unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].asset_id, broken_id);
    assert_eq!(outcome.failures[0].display_name, "broken.png");
    assert!(outcome.failures[0].to_string().contains("broken.png"));

    assert_eq!(ids(&outcome.record.images), vec!["7", good_id.as_str()]);
    let referenced = referenced_ids(&outcome.record.content);
    assert_eq!(referenced, vec!["7", good_id.as_str()]);
}

#[tokio::test]
async fn test_all_or_nothing_rejects_partial_saves() {
    let assembler = assembler(MockUploader::failing(&["broken.png"])).with_policy(SavePolicy::AllOrNothing);

    let mut doc = assembler.load_for_editing(&hello_record());
    let broken = PendingUpload::new("broken.png", "blob:broken", PNG.to_vec());
    doc.insert_image(broken.asset.clone());
    let broken_id = broken.id().clone();

    match assembler.prepare_for_save(doc, vec![broken]).await {
        Err(SaveError::UploadsFailed(failures)) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].asset_id, broken_id);
        }
        Ok(outcome) => panic!("expected failure, got {:?}", outcome.record),
    }
}

#[tokio::test]
async fn test_image_order_ignores_upload_completion_order() {
    let uploader = Arc::new(MockUploader::with_delays(&[("a.png", 40), ("b.png", 5), ("c.png", 20)]));
    let assembler = DocumentAssembler::new(UrlNormalizer::new("http://host"), "uploads/charts", uploader.clone());

    let mut doc = assembler.load_for_editing(&RawRecord::default());
    let pending: Vec<PendingUpload> = ["a.png", "b.png", "c.png"]
        .iter()
        .map(|name| PendingUpload::new(name, &format!("blob:{}", name), PNG.to_vec()))
        .collect();
    for upload in &pending {
        doc.insert_image(upload.asset.clone());
    }
    let expected: Vec<String> = pending.iter().map(|p| p.id().to_string()).collect();

    let outcome = assembler.prepare_for_save(doc, pending).await.unwrap();

    assert_eq!(ids(&outcome.record.images), expected.iter().map(String::as_str).collect::<Vec<_>>());
    let completed = uploader.completed.lock().unwrap().clone();
    assert_eq!(completed, vec!["b.png", "c.png", "a.png"]);
}

#[tokio::test]
async fn test_non_image_payload_never_reaches_the_uploader() {
    let uploader = Arc::new(MockUploader::default());
    let assembler = DocumentAssembler::new(UrlNormalizer::new("http://host"), "uploads/poskas", uploader.clone());

    let mut doc = assembler.load_for_editing(&RawRecord::default());
    let pdf = PendingUpload::new("laporan.pdf", "blob:pdf", b"%PDF-1.7 ...".to_vec());
    doc.insert_image(pdf.asset.clone());

    let outcome = assembler.prepare_for_save(doc, vec![pdf]).await.unwrap();

    assert_eq!(uploader.call_count(), 0);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.record.images.is_empty());
    assert_eq!(outcome.record.content, "");
}

#[tokio::test]
async fn test_malformed_image_list_degrades_to_diagnostics() {
    let assembler = assembler(MockUploader::default());
    let record = RawRecord::new("Kas [IMG:7] masuk", Value::String("[{broken".into()));

    let doc = assembler.load_for_editing(&record);
    assert!(doc.assets.is_empty());
    assert!(doc.image_ids().is_empty());

    let outcome = assembler.prepare_for_save(doc, Vec::new()).await.unwrap();
    assert!(outcome.record.images.is_empty());
    assert_eq!(outcome.record.content, "Kas [image not found: 7] masuk");
}

#[tokio::test]
async fn test_legacy_asset_without_storage_path_or_data_is_dropped() {
    let assembler = assembler(MockUploader::default());
    // Local reference left over from an interrupted session: nothing to upload
    let record = RawRecord::new(
        "a [IMG:5] b",
        json!([{"id": 5, "url": "blob:http://localhost/gone"}]),
    );

    let doc = assembler.load_for_editing(&record);
    assert_eq!(doc.image_ids().len(), 1);

    let outcome = assembler.prepare_for_save(doc, Vec::new()).await.unwrap();
    assert!(outcome.record.images.is_empty());
    assert_eq!(outcome.record.content, "a  b");
}

#[tokio::test]
async fn test_data_uri_paste_round_trips_through_storage() {
    let assembler = assembler(MockUploader::default());

    let mut doc = assembler.load_for_editing(&RawRecord::new("<strong>Grafik</strong>", Value::Null));
    let pasted = PendingUpload::from_data_uri("", "data:image/png;base64,iVBORw0KGgoAAAAN").unwrap();
    doc.push_line_break();
    doc.insert_image(pasted.asset.clone());
    let pasted_id = pasted.id().clone();

    let outcome = assembler.prepare_for_save(doc, vec![pasted]).await.unwrap();
    assert_eq!(outcome.record.content, format!("<strong>Grafik</strong>\n[IMG:{}]", pasted_id));
    assert_eq!(outcome.record.images[0].display_name, format!("image-{}", pasted_id));

    // Stored as an encoded string column, opened again
    let column = outcome.record.images_json().unwrap();
    let reopened = assembler.load_for_editing(&RawRecord::new(outcome.record.content.clone(), Value::String(column)));
    assert_eq!(reopened.image_ids(), vec![pasted_id]);
    assert_eq!(reopened.assets[0].url, outcome.record.images[0].url);
}
