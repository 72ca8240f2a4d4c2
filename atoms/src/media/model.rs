use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static LAST_GENERATED: AtomicU64 = AtomicU64::new(0);

/// Identity of an image inside one document.
///
/// Stored records carry ids as JSON numbers (older ones as floats such as
/// `1699999999999.123`), newer clients as strings. Everything is compared
/// by its textual form, which is also what appears inside `[IMG:<id>]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Client-side id for a freshly inserted image: epoch millis followed by
    /// a three digit random suffix. Digits only, so it always fits the
    /// placeholder grammar. Ids issued by one process strictly increase.
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let suffix = (uuid::Uuid::new_v4().as_u128() % 1000) as u64;
        let candidate = millis * 1000 + suffix;
        let previous = LAST_GENERATED
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                Some(candidate.max(last + 1))
            })
            .unwrap_or(candidate);
        Self(candidate.max(previous + 1).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the id can appear inside `[IMG:<id>]`: ASCII digits with an
    /// optional fractional part.
    pub fn fits_placeholder(&self) -> bool {
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        match self.0.split_once('.') {
            Some((whole, fraction)) => digits(whole) && digits(fraction),
            None => digits(&self.0),
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<u64> for AssetId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Keep numeric ids numeric as long as the text survives the trip
        if let Ok(n) = self.0.parse::<u64>() {
            if n.to_string() == self.0 {
                return serializer.serialize_u64(n);
            }
        }
        if let Ok(f) = self.0.parse::<f64>() {
            if f.is_finite() && f.to_string() == self.0 {
                return serializer.serialize_f64(f);
            }
        }
        serializer.serialize_str(&self.0)
    }
}

struct AssetIdVisitor;

impl<'de> Visitor<'de> for AssetIdVisitor {
    type Value = AssetId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an image id as a number or a string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<AssetId, E> {
        Ok(AssetId(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<AssetId, E> {
        Ok(AssetId(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<AssetId, E> {
        if !v.is_finite() {
            return Err(E::custom("image id must be a finite number"));
        }
        Ok(AssetId(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<AssetId, E> {
        Ok(AssetId::new(v))
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AssetIdVisitor)
    }
}

/// One image known to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub id: AssetId,
    #[serde(
        default,
        alias = "name",
        alias = "filename",
        alias = "display_name",
        deserialize_with = "lossy_string"
    )]
    pub display_name: String,
    /// Temporary reference to binary data that has not been uploaded yet.
    /// Never persisted.
    #[serde(
        default,
        skip_serializing,
        alias = "local_uri",
        deserialize_with = "lossy_opt_string"
    )]
    pub local_uri: Option<String>,
    /// Display URL, recomputed on every load.
    #[serde(default, deserialize_with = "lossy_string")]
    pub url: String,
    /// Storage path assigned by the upload collaborator. This is the
    /// authoritative location.
    #[serde(
        default,
        alias = "path",
        alias = "server_path",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lossy_opt_string"
    )]
    pub server_path: Option<String>,
}

impl ImageAsset {
    /// A freshly inserted image that still has to be uploaded.
    pub fn local(display_name: impl Into<String>, local_uri: impl Into<String>) -> Self {
        let local_uri = local_uri.into();
        Self {
            id: AssetId::generate(),
            display_name: display_name.into(),
            url: local_uri.clone(),
            local_uri: Some(local_uri),
            server_path: None,
        }
    }

    pub fn persisted(
        id: impl Into<AssetId>,
        display_name: impl Into<String>,
        server_path: impl Into<String>,
    ) -> Self {
        let server_path = server_path.into();
        Self {
            id: id.into(),
            display_name: display_name.into(),
            local_uri: None,
            url: server_path.clone(),
            server_path: Some(server_path),
        }
    }

    /// Has a storage path, so it may go into a stored record.
    pub fn is_persisted(&self) -> bool {
        self.server_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Holds local data and waits for an upload.
    pub fn is_pending(&self) -> bool {
        !self.is_persisted() && self.local_uri.is_some()
    }

    /// An asset with neither a storage path nor local data points nowhere.
    pub fn is_valid(&self) -> bool {
        self.is_persisted() || self.local_uri.is_some()
    }

    pub fn alt_text(&self) -> String {
        if self.display_name.trim().is_empty() {
            format!("image {}", self.id)
        } else {
            self.display_name.clone()
        }
    }
}

fn lossy_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lossy_opt_string(deserializer)?.unwrap_or_default())
}

fn lossy_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let text = match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Ok(None),
    };
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}
