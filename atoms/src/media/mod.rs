// Re-export model types, URL normalization and registry parsing
pub mod model;
pub mod registry;
pub mod url;

pub use model::{AssetId, ImageAsset};
pub use registry::{parse_image_list, parse_image_list_str};
pub use url::{asset_origin_from_api_base, is_local_reference, normalize_url, UrlNormalizer};
