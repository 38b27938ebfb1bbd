//! Object key helpers.
//!
//! Object stores have no directories; a "container" or "folder" is a key
//! prefix ending in `/`.

/// Join path segments with `/`, skipping empty segments and trimming stray
/// slashes at the joints.
///
/// ```
/// use s3probe_core::keys::join_key;
///
/// assert_eq!(join_key(["load", "", "Container-0000001/", "a.pdf"]), "load/Container-0000001/a.pdf");
/// ```
#[must_use]
pub fn join_key<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut key = String::new();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(segment);
    }
    key
}

/// Turn a key into a folder prefix (`"a/b"` becomes `"a/b/"`).
///
/// An empty key stays empty so that it still matches the whole bucket.
#[must_use]
pub fn folder_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_owned()
    } else {
        format!("{key}/")
    }
}
