/// Content type guessed from the extension of the key's last path segment.
///
/// Returns an empty string when the key has no extension or the extension is unknown.
pub fn content_type_for(key: &str) -> &'static str {
    mime_guess::from_path(key).first_raw().unwrap_or("")
}
