/// Longest accepted filename, in bytes
pub const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Picks the caller's filename as sent, or `fallback` when the header is absent or blank.
pub fn resolve_filename<'a>(header: Option<&'a str>, fallback: &'a str) -> &'a str {
    match header {
        Some(name) if !name.trim().is_empty() => name,
        _ => fallback,
    }
}

/// Checks a caller-supplied filename before it is used anywhere.
///
/// Unlike a sanitizer this never rewrites the name: the remote file must carry
/// exactly what the caller asked for, so anything unsafe is rejected.
pub fn validate_filename(filename: &str) -> Result<&str, ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        });
    }

    if filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {:?}", filename);
        return Err(ValidationError {
            code: "PATH_TRAVERSAL",
            message: format!(
                "Filename '{}' must not contain path separators",
                filename.escape_debug()
            ),
        });
    }

    if filename == "." || filename == ".." {
        return Err(ValidationError {
            code: "PATH_TRAVERSAL",
            message: format!("Filename cannot be '{}'", filename),
        });
    }

    if filename.chars().any(char::is_control) {
        return Err(ValidationError {
            code: "CONTROL_CHARACTER",
            message: "Filename contains control characters".to_string(),
        });
    }

    if filename.len() > MAX_FILENAME_LEN {
        return Err(ValidationError {
            code: "FILENAME_TOO_LONG",
            message: format!(
                "Filename is {} bytes, maximum is {}",
                filename.len(),
                MAX_FILENAME_LEN
            ),
        });
    }

    Ok(filename)
}
