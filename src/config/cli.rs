use crate::utils::error::{GenError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

fn mime_for(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => Ok("image/png"),
        Some("jpg") | Some("jpeg") => Ok("image/jpeg"),
        Some("gif") => Ok("image/gif"),
        Some("webp") => Ok("image/webp"),
        Some(other) => Err(GenError::InvalidConfigValueError {
            field: "image".to_string(),
            value: path.display().to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: png, jpg, jpeg, gif, webp",
                other
            ),
        }),
        None => Err(GenError::InvalidConfigValueError {
            field: "image".to_string(),
            value: path.display().to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

/// Reads an image file into a `data:<mime>;base64,...` URL.
pub async fn load_image_data_url(path: &Path) -> Result<String> {
    let mime = mime_for(path)?;

    let size = tokio::fs::metadata(path).await?.len();
    if size > MAX_IMAGE_BYTES {
        return Err(GenError::InvalidConfigValueError {
            field: "image".to_string(),
            value: path.display().to_string(),
            reason: format!("File is {} bytes, limit is {}", size, MAX_IMAGE_BYTES),
        });
    }

    let bytes = tokio::fs::read(path).await?;
    tracing::debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}
