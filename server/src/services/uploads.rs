// kibbledrop_server/src/services/uploads.rs

//! Image uploads for the catalog plus validation of the inline data-URI
//! attachments on pet profiles. File type is decided by magic bytes, not
//! by the client-supplied name or content type.

use crate::errors::{AppError, Result as AppResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
  Jpeg,
  Png,
  Webp,
}

impl ImageKind {
  pub fn extension(&self) -> &'static str {
    match self {
      ImageKind::Jpeg => "jpg",
      ImageKind::Png => "png",
      ImageKind::Webp => "webp",
    }
  }

  pub fn mime(&self) -> &'static str {
    match self {
      ImageKind::Jpeg => "image/jpeg",
      ImageKind::Png => "image/png",
      ImageKind::Webp => "image/webp",
    }
  }
}

/// Identifies JPEG, PNG, or WebP from the leading bytes.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
  if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
    return Some(ImageKind::Jpeg);
  }
  if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
    return Some(ImageKind::Png);
  }
  if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
    return Some(ImageKind::Webp);
  }
  None
}

fn check_image(bytes: &[u8], max_bytes: usize) -> AppResult<ImageKind> {
  if bytes.is_empty() {
    return Err(AppError::Validation("Uploaded file is empty.".to_string()));
  }
  if bytes.len() > max_bytes {
    return Err(AppError::Validation(format!(
      "File exceeds the {} byte upload limit.",
      max_bytes
    )));
  }
  sniff_image(bytes)
    .ok_or_else(|| AppError::Validation("Only JPEG, PNG, and WebP images are accepted.".to_string()))
}

/// Writes validated image bytes under `upload_dir` with a generated name
/// and returns the public path (`/uploads/<name>`).
#[instrument(name = "uploads::store_image", skip(bytes), fields(size = bytes.len()))]
pub async fn store_image(upload_dir: &str, max_bytes: usize, bytes: &[u8]) -> AppResult<String> {
  let kind = check_image(bytes, max_bytes)?;

  let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
  let path = Path::new(upload_dir).join(&file_name);

  tokio::fs::create_dir_all(upload_dir)
    .await
    .map_err(|e| AppError::Internal(format!("Could not create upload directory: {}", e)))?;
  tokio::fs::write(&path, bytes)
    .await
    .map_err(|e| AppError::Internal(format!("Could not store upload: {}", e)))?;

  info!("Stored {} upload at {}.", kind.mime(), path.display());
  Ok(format!("/uploads/{}", file_name))
}

/// Validates an inline `data:image/...;base64,` attachment and returns it
/// normalized (declared mime replaced by the sniffed one).
pub fn validate_data_uri(raw: &str, max_bytes: usize) -> AppResult<String> {
  let rest = raw
    .strip_prefix("data:")
    .ok_or_else(|| AppError::Validation("Attachment must be a base64 data URI.".to_string()))?;
  let (_, encoded) = rest
    .split_once(";base64,")
    .ok_or_else(|| AppError::Validation("Attachment must be base64-encoded.".to_string()))?;

  let bytes = BASE64
    .decode(encoded)
    .map_err(|_| AppError::Validation("Attachment is not valid base64.".to_string()))?;
  let kind = check_image(&bytes, max_bytes)?;

  Ok(format!("data:{};base64,{}", kind.mime(), encoded))
}

#[cfg(test)]
mod tests {
  use super::*;

  const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

  #[test]
  fn sniffs_by_magic_bytes() {
    assert_eq!(sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), Some(ImageKind::Jpeg));
    assert_eq!(sniff_image(&PNG_HEADER), Some(ImageKind::Png));

    let mut webp = b"RIFF".to_vec();
    webp.extend_from_slice(&[0x10, 0x00, 0x00, 0x00]);
    webp.extend_from_slice(b"WEBPVP8 ");
    assert_eq!(sniff_image(&webp), Some(ImageKind::Webp));

    assert_eq!(sniff_image(b"GIF89a"), None);
    assert_eq!(sniff_image(&[]), None);
  }

  #[test]
  fn oversized_and_unknown_payloads_are_rejected() {
    let big = vec![0xFF; 16];
    assert!(check_image(&big, 8).is_err());
    assert!(check_image(b"plain text", 1024).is_err());
    assert!(check_image(&PNG_HEADER, 1024).is_ok());
  }

  #[test]
  fn data_uri_mime_is_normalized_to_sniffed_type() {
    // Declared as JPEG, actually PNG.
    let encoded = BASE64.encode(PNG_HEADER);
    let uri = format!("data:image/jpeg;base64,{}", encoded);
    let normalized = validate_data_uri(&uri, 1024).unwrap();
    assert!(normalized.starts_with("data:image/png;base64,"));
  }

  #[test]
  fn malformed_data_uris_are_rejected() {
    assert!(validate_data_uri("not a uri", 1024).is_err());
    assert!(validate_data_uri("data:image/png;base64,!!!", 1024).is_err());
    let text = BASE64.encode(b"hello");
    assert!(validate_data_uri(&format!("data:image/png;base64,{}", text), 1024).is_err());
  }
}
