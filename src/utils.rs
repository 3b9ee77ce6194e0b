use std::path::Path;

use crate::error::D1Error;

/// Validates an output directory, creating it if it does not exist.
///
/// # Errors
///
/// A client-side error if the path exists but is not a directory, or if it
/// cannot be created.
pub(crate) async fn validate_directory(out_dir: &Path) -> Result<(), D1Error> {
    if out_dir.exists() && !out_dir.is_dir() {
        return Err(D1Error::client_message(format!(
            "The output directory is not a directory: {}",
            out_dir.display()
        )));
    }

    if !out_dir.exists() {
        tokio::fs::create_dir_all(out_dir).await.map_err(|e| {
            D1Error::client_side(
                format!("Could not create directory {}", out_dir.display()),
                Some(e),
            )
        })?;
    }

    Ok(())
}

/// Truncates `text` to at most `max` characters, marking the cut.
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
