//! Beacon ingestion
//!
//! Validates and normalizes an incoming page-view beacon, derives the visitor
//! fingerprint, and persists exactly one row. Repeated identical events are
//! all stored; deduplication is a read-time concern.

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::analytics::models::NewPageView;
use crate::analytics::visitor;
use crate::storage::Storage;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("invalid percent-encoding in {0:?}")]
    InvalidEscape(String),
    #[error("unparseable url {0:?}")]
    Unparseable(String),
}

/// A beacon as it arrives off the wire: loosely-typed query parameters plus
/// transport metadata. All fields are opaque strings until normalized.
#[derive(Debug, Clone)]
pub struct RawPageView {
    pub project_id: String,
    /// The `path` query parameter: a full URL or a rootless path reference
    pub url: String,
    pub title: String,
    pub referrer: String,
    /// Client network address, used only for fingerprinting
    pub client_addr: String,
    pub user_agent: String,
}

/// Accepts raw beacons and writes validated page views through storage.
#[derive(Clone)]
pub struct PageViewCollector {
    storage: Arc<dyn Storage>,
    hash_visitors: bool,
}

impl PageViewCollector {
    pub fn new(storage: Arc<dyn Storage>, hash_visitors: bool) -> Self {
        Self {
            storage,
            hash_visitors,
        }
    }

    /// Validate, normalize, and persist one page view.
    ///
    /// An unparseable `url` is a client-input failure and writes nothing.
    pub async fn record(&self, raw: RawPageView) -> Result<(), IngestError> {
        let path = normalize_path(&raw.url)?;

        let visitor_hash = if self.hash_visitors {
            visitor::fingerprint(&raw.project_id, &raw.client_addr, &raw.user_agent)
        } else {
            String::new()
        };

        let view = NewPageView {
            project_id: raw.project_id,
            path,
            title: raw.title,
            referrer: raw.referrer,
            visitor_hash,
            user_agent: raw.user_agent,
        };

        self.storage.insert_page_view(&view).await?;
        Ok(())
    }
}

/// Extract the path component from a beacon's `path` parameter.
///
/// Accepts absolute URLs ("https://x.test/docs") and rootless references
/// ("/docs", what `location.pathname` sends). An empty path component becomes
/// "/"; the result always starts with "/".
pub fn normalize_path(raw: &str) -> Result<String, PathError> {
    if !has_valid_escapes(raw) {
        return Err(PathError::InvalidEscape(raw.to_string()));
    }

    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://beacon.invalid/")
            .and_then(|base| base.join(raw))
            .map_err(|_| PathError::Unparseable(raw.to_string()))?,
        Err(_) => return Err(PathError::Unparseable(raw.to_string())),
    };

    let path = parsed.path();
    if path.trim().is_empty() {
        Ok("/".to_string())
    } else {
        Ok(path.to_string())
    }
}

/// Every '%' must introduce a two-hex-digit escape sequence.
fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_url_without_path_normalizes_to_root() {
        assert_eq!(normalize_path("https://x.test").unwrap(), "/");
        assert_eq!(normalize_path("https://x.test/").unwrap(), "/");
    }

    #[test]
    fn absolute_url_keeps_its_path() {
        assert_eq!(
            normalize_path("https://x.test/docs/intro").unwrap(),
            "/docs/intro"
        );
    }

    #[test]
    fn rootless_reference_is_accepted() {
        assert_eq!(normalize_path("/pricing").unwrap(), "/pricing");
        assert_eq!(normalize_path("").unwrap(), "/");
    }

    #[test]
    fn percent_escapes_survive_normalization() {
        assert_eq!(
            normalize_path("/s%C3%B8k/results").unwrap(),
            "/s%C3%B8k/results"
        );
    }

    #[test]
    fn invalid_percent_encoding_is_rejected() {
        assert!(matches!(
            normalize_path("/bad%zzpath"),
            Err(PathError::InvalidEscape(_))
        ));
        assert!(matches!(
            normalize_path("https://x.test/trailing%"),
            Err(PathError::InvalidEscape(_))
        ));
        assert!(matches!(
            normalize_path("/short%a"),
            Err(PathError::InvalidEscape(_))
        ));
    }

    #[test]
    fn result_always_starts_with_slash() {
        for raw in ["x.test/page", "relative/path", "https://a.b/c"] {
            let path = normalize_path(raw).unwrap();
            assert!(path.starts_with('/'), "{:?} -> {:?}", raw, path);
        }
    }
}
