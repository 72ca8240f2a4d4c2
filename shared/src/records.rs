use crate::kinds::RecordKind;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use inline_images_block::{RawRecord, StoredRecord};
use serde_json::{Map, Value};

/// Attribute holding the image list of a content field.
pub fn images_attribute(field: &str) -> String {
    format!("{}_images", field)
}

/// Read one content field of a record. `Ok(None)` when the record does
/// not exist.
pub async fn load_record_content(
    client: &DynamoClient,
    table_name: &str,
    kind: RecordKind,
    record_id: &str,
    field: &str,
) -> Result<Option<RawRecord>, String> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(kind.partition_key()))
        .key("SK", AttributeValue::S(kind.sort_key(record_id)))
        .projection_expression("#content, #images")
        .expression_attribute_names("#content", field)
        .expression_attribute_names("#images", images_attribute(field))
        .send()
        .await
        .map_err(|e| format!("DynamoDB get_item error: {}", e))?;

    let Some(item) = result.item() else {
        tracing::info!("Record {} not found", kind.sort_key(record_id));
        return Ok(None);
    };

    let content = item
        .get(field)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string());
    let images = item
        .get(&images_attribute(field))
        .map(attribute_to_json)
        .unwrap_or(Value::Null);

    tracing::info!(
        "📥 Loaded {}.{} content_chars={} images_present={}",
        kind.sort_key(record_id),
        field,
        content.as_deref().map(str::len).unwrap_or(0),
        !images.is_null(),
    );

    Ok(Some(RawRecord { content, images }))
}

/// Write a content field and its image list back, stamping `updated_at`.
/// The image list is stored as JSON text.
pub async fn save_record_content(
    client: &DynamoClient,
    table_name: &str,
    kind: RecordKind,
    record_id: &str,
    field: &str,
    record: &StoredRecord,
) -> Result<(), String> {
    let images = record
        .images_json()
        .map_err(|e| format!("Failed to serialize images: {}", e))?;
    let now = chrono::Utc::now().to_rfc3339();

    client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(kind.partition_key()))
        .key("SK", AttributeValue::S(kind.sort_key(record_id)))
        .update_expression("SET #content = :content, #images = :images, updated_at = :now")
        .expression_attribute_names("#content", field)
        .expression_attribute_names("#images", images_attribute(field))
        .expression_attribute_values(":content", AttributeValue::S(record.content.clone()))
        .expression_attribute_values(":images", AttributeValue::S(images))
        .expression_attribute_values(":now", AttributeValue::S(now))
        .send()
        .await
        .map_err(|e| {
            tracing::error!("❌ Saving {}.{} failed: {}", kind.sort_key(record_id), field, e);
            format!("DynamoDB update_item error: {}", e)
        })?;

    tracing::info!(
        "✅ Saved {}.{} images={}",
        kind.sort_key(record_id),
        field,
        record.images.len()
    );
    Ok(())
}

/// Older rows keep the image list as a native list or map instead of
/// text. Either way it ends up as the JSON value the registry parses.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => serde_json::from_str::<serde_json::Number>(n)
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(n.clone())),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poskas_atoms::media::UrlNormalizer;
    use std::collections::HashMap;

    #[test]
    fn test_images_attribute() {
        assert_eq!(images_attribute("content"), "content_images");
        assert_eq!(images_attribute("notes"), "notes_images");
    }

    #[test]
    fn test_attribute_to_json_native_list() {
        let entry = AttributeValue::M(HashMap::from([
            ("id".to_string(), AttributeValue::N("7".to_string())),
            ("url".to_string(), AttributeValue::S("/uploads/x.jpg".to_string())),
            ("name".to_string(), AttributeValue::Null(true)),
        ]));
        let value = attribute_to_json(&AttributeValue::L(vec![entry]));

        assert_eq!(
            value,
            serde_json::json!([{"id": 7, "url": "/uploads/x.jpg", "name": null}])
        );
    }

    #[test]
    fn test_attribute_to_json_scalars() {
        assert_eq!(attribute_to_json(&AttributeValue::N("1.5".into())), serde_json::json!(1.5));
        assert_eq!(attribute_to_json(&AttributeValue::N("oops".into())), serde_json::json!("oops"));
        assert_eq!(attribute_to_json(&AttributeValue::Bool(true)), serde_json::json!(true));
    }

    #[test]
    fn test_text_and_native_image_lists_load_the_same() {
        let normalizer = UrlNormalizer::new("http://host");
        let text = AttributeValue::S(r#"[{"id":7,"url":"/uploads/x.jpg"}]"#.to_string());
        let native = AttributeValue::L(vec![AttributeValue::M(HashMap::from([
            ("id".to_string(), AttributeValue::N("7".to_string())),
            ("url".to_string(), AttributeValue::S("/uploads/x.jpg".to_string())),
        ]))]);

        let from_text = poskas_atoms::media::parse_image_list(&attribute_to_json(&text), &normalizer);
        let from_native = poskas_atoms::media::parse_image_list(&attribute_to_json(&native), &normalizer);
        assert_eq!(from_text, from_native);
        assert_eq!(from_text[0].url, "http://host/uploads/x.jpg");
    }
}
