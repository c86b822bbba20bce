use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("empty key")]
    Empty,
    #[error("control character at byte {position}")]
    ControlCharacter { position: usize },
}

/// Strip a trailing carriage return and the leading run of decimal digits from an input line.
pub fn sanitize_line(line: &str) -> &str {
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Percent-encode each `/`-separated segment of a key, keeping the separators.
///
/// The result is suitable both as the tail of a copy source (`bucket + escaped`)
/// and as the tail of an origin URL path.
pub fn escape_key(key: &str) -> Result<String, KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if let Some((position, _)) = key.char_indices().find(|(_, c)| c.is_control()) {
        return Err(KeyError::ControlCharacter { position });
    }

    let escaped = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok(escaped)
}
