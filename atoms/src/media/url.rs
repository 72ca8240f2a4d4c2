//! Image URL normalization.
//!
//! Image references reach us in many shapes: server-relative paths,
//! absolute URLs with a doubled scheme (`http://http://…`), URLs on a host
//! the app no longer runs on, API-prefixed upload paths and in-memory
//! references for images that were never uploaded. [`UrlNormalizer`] turns
//! all of them into one absolute URL served by the current deployment.
//!
//! Normalizing is idempotent and never fails; garbage in gives best-effort
//! output, empty in gives empty out.

const SCHEMES: [&str; 2] = ["https://", "http://"];
const LOCAL_PREFIXES: [&str; 4] = ["blob:", "data:", "file:", "content:"];
const API_UPLOADS: &str = "/api/uploads/";
const STATIC_UPLOADS: &str = "/uploads/";

/// Canonicalizes image URLs against one deployment's asset origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlNormalizer {
    base: String,
    legacy_origins: Vec<String>,
}

impl UrlNormalizer {
    /// `base` is the asset-serving origin, not the API origin. Use
    /// [`asset_origin_from_api_base`] when only the latter is known.
    pub fn new(base: &str) -> Self {
        Self {
            base: trim_origin(base),
            legacy_origins: Vec::new(),
        }
    }

    /// Origins whose URLs get moved onto `base`.
    pub fn with_legacy_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.legacy_origins = origins
            .into_iter()
            .map(|o| trim_origin(o.as_ref()))
            .filter(|o| !o.is_empty())
            .collect();
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn normalize(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }
        if is_local_reference(raw) {
            return raw.to_string();
        }

        let collapsed = collapse_scheme(raw);
        let absolute = if scheme_len(collapsed).is_some() {
            collapsed.to_string()
        } else if let Some(rest) = collapsed.strip_prefix("//") {
            let rest = rest.trim_start_matches('/');
            // `//http://host/x` already names its scheme
            if scheme_len(rest).is_some() {
                collapse_scheme(rest).to_string()
            } else {
                format!("{}//{}", self.scheme(), rest)
            }
        } else {
            self.join(collapsed)
        };

        let rebased = if scheme_len(&absolute).is_some() {
            self.rebase_legacy(absolute)
        } else {
            absolute
        };

        collapse_api_uploads(rebased)
    }

    /// Storage path for a URL: the normalized URL with this deployment's
    /// origin stripped. Foreign absolute URLs are returned whole. Local
    /// references have no storage path.
    pub fn server_path(&self, url: &str) -> Option<String> {
        let normalized = self.normalize(url);
        if normalized.is_empty() || is_local_reference(&normalized) {
            return None;
        }
        if !self.base.is_empty() {
            if let Some(rest) = strip_origin(&normalized, &self.base) {
                return Some(if rest.is_empty() { "/".to_string() } else { rest.to_string() });
            }
        }
        Some(normalized)
    }

    fn scheme(&self) -> &str {
        match scheme_len(&self.base) {
            Some(len) => &self.base[..len - 2],
            None => "https:",
        }
    }

    fn join(&self, path: &str) -> String {
        let path = path.trim_start_matches("./").trim_start_matches('/');
        format!("{}/{}", self.base, path)
    }

    fn rebase_legacy(&self, url: String) -> String {
        if self.base.is_empty() || strip_origin(&url, &self.base).is_some() {
            return url;
        }
        for origin in &self.legacy_origins {
            if let Some(rest) = strip_origin(&url, origin) {
                return format!("{}{}", self.base, rest);
            }
        }
        url
    }
}

/// One-shot form of [`UrlNormalizer::normalize`].
pub fn normalize_url(raw: &str, base: &str) -> String {
    UrlNormalizer::new(base).normalize(raw)
}

/// Asset origin for an API base such as `https://host/api`.
pub fn asset_origin_from_api_base(api_base: &str) -> String {
    let base = trim_origin(api_base);
    match base.strip_suffix("/api") {
        Some(origin) => origin.to_string(),
        None => base,
    }
}

/// In-memory or on-device reference to data that has not been uploaded.
pub fn is_local_reference(raw: &str) -> bool {
    let raw = raw.trim_start();
    LOCAL_PREFIXES.iter().any(|p| starts_with_ignore_case(raw, p))
}

fn trim_origin(raw: &str) -> String {
    collapse_scheme(raw.trim()).trim_end_matches('/').to_string()
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn scheme_len(s: &str) -> Option<usize> {
    SCHEMES
        .iter()
        .find(|scheme| starts_with_ignore_case(s, scheme))
        .map(|scheme| scheme.len())
}

/// `http://https://host` -> `https://host`: the innermost scheme wins.
fn collapse_scheme(s: &str) -> &str {
    let mut current = s;
    while let Some(len) = scheme_len(current) {
        let rest = &current[len..];
        if scheme_len(rest).is_none() {
            break;
        }
        current = rest;
    }
    current
}

fn strip_origin<'a>(url: &'a str, origin: &str) -> Option<&'a str> {
    if !starts_with_ignore_case(url, origin) {
        return None;
    }
    let rest = &url[origin.len()..];
    (rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')).then_some(rest)
}

fn collapse_api_uploads(mut url: String) -> String {
    while let Some(pos) = url.find(API_UPLOADS) {
        url.replace_range(pos..pos + API_UPLOADS.len(), STATIC_UPLOADS);
    }
    url
}
