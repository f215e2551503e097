//! Reading and validating an inbound room upload.

use axum::extract::Multipart;
use bytes::Bytes;
use tracing::debug;

use super::endpoint::{ROOM_EXTENSION, UPLOAD_FIELD};
use crate::error::RelayError;

/// A validated room file taken from an inbound multipart form.
#[derive(Debug, Clone)]
pub struct RoomUpload {
    /// Client-supplied filename, ending in the room extension
    pub filename: String,

    /// Content type of the form part, when the client sent one
    pub content_type: Option<String>,

    /// File contents
    pub data: Bytes,
}

/// Check whether a filename carries the room extension, ignoring case.
pub fn has_room_extension(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(ROOM_EXTENSION)
}

/// Extract the room file from a multipart form.
///
/// Fields other than `file` are skipped. The filename is checked before the
/// file contents are read.
pub async fn read_room_upload(mut multipart: Multipart) -> Result<RoomUpload, RelayError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => {
                return Err(RelayError::InvalidUpload(
                    "Invalid file: the file field must be a file upload".to_string(),
                ))
            }
        };

        if !has_room_extension(&filename) {
            return Err(RelayError::InvalidUpload(format!(
                "File must be a {} file",
                ROOM_EXTENSION
            )));
        }

        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        debug!(filename = %filename, size = data.len(), "Read room upload");

        return Ok(RoomUpload {
            filename,
            content_type,
            data,
        });
    }

    Err(RelayError::InvalidUpload("No file provided".to_string()))
}
