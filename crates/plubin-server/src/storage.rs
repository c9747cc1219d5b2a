//! URLs into the external object storage that holds model files.
//!
//! The bucket itself is provisioned out of band with public read access;
//! the catalog only stores URLs pointing into it (`assets.skp_url`).

use crate::config::StorageConfig;

/// Builds the public URL of an object in the configured bucket.
///
/// Returns `None` for paths that are empty or try to leave the bucket.
pub fn public_object_url(storage: &StorageConfig, path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return None;
    }

    Some(format!(
        "{}/storage/v1/object/public/{}/{}",
        storage.public_base_url.trim_end_matches('/'),
        storage.bucket,
        path
    ))
}
