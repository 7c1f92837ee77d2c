use axum::extract::{Multipart, Query};
use axum::response::Json;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use motusdao_common::{ApiResponse, AppError};

use super::{error_reply, HandlerError, HandlerResult};

// Maximum file size: 5MB
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

// Allowed file types
const ALLOWED_TYPES: [&str; 5] = [
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivoSubido {
    pub file_url: String,
    pub filename: String,
    pub file_size: usize,
    pub file_type: String,
    pub warning: String,
}

// Accept a certification document and hand back a base64 data URL.
// Placeholder for real object storage; the data URL is the "upload".
pub async fn upload_document(mut multipart: Multipart) -> HandlerResult<ArchivoSubido> {
    let mut archivo: Option<(String, String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_upload(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("documento").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_upload(format!("Failed to read file: {}", e)))?;
            archivo = Some((filename, content_type, data));
        }
    }

    let Some((filename, content_type, data)) = archivo else {
        return Err(bad_upload("No file provided".to_string()));
    };

    validar_archivo(&content_type, data.len())
        .map_err(|err| error_reply("Failed to upload file", err))?;

    let encoded = STANDARD.encode(&data);
    let file_url = format!("data:{};base64,{}", content_type, encoded);

    let extension = filename.rsplit('.').next().unwrap_or("dat");
    let sello = Uuid::new_v4().simple().to_string();
    let unique_filename = format!(
        "cert_{}_{}.{}",
        Utc::now().timestamp_millis(),
        &sello[..6],
        extension
    );

    tracing::info!(
        "File uploaded: {}, size: {} bytes, type: {}",
        unique_filename,
        data.len(),
        content_type
    );

    Ok(Json(ApiResponse::with_message(
        ArchivoSubido {
            file_url,
            filename: unique_filename,
            file_size: data.len(),
            file_type: content_type,
            warning: "Using base64 encoding. Upgrade to cloud storage for production.".to_string(),
        },
        "File uploaded successfully",
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    pub file_url: Option<String>,
}

// Nothing to delete for a data URL; acknowledge for API symmetry
pub async fn delete_document(
    Json(request): Json<DeleteFileRequest>,
) -> HandlerResult<()> {
    if request.file_url.is_none() {
        return Err(bad_upload("File URL is required".to_string()));
    }

    Ok(Json(ApiResponse::with_message((), "File deleted successfully")))
}

#[derive(Debug, Deserialize)]
pub struct FileMetadataQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileMetadata {
    pub exists: bool,
}

pub async fn file_metadata(
    Query(params): Query<FileMetadataQuery>,
) -> HandlerResult<FileMetadata> {
    if params.filename.is_none() {
        return Err(bad_upload("Filename is required".to_string()));
    }

    Ok(Json(ApiResponse::with_message(
        FileMetadata { exists: false },
        "File metadata retrieval not implemented for base64 storage",
    )))
}

fn bad_upload(message: String) -> HandlerError {
    error_reply("Failed to upload file", AppError::Validation(message))
}

/// Size and content-type gate for certification documents.
pub(crate) fn validar_archivo(content_type: &str, size: usize) -> Result<(), AppError> {
    if size > MAX_FILE_SIZE {
        return Err(AppError::Validation(format!(
            "File size exceeds maximum of {}MB",
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }

    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(AppError::Validation(
            "Invalid file type. Allowed types: PDF, JPG, PNG, WEBP".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_allowed_type_under_the_limit() {
        for tipo in ALLOWED_TYPES {
            assert!(validar_archivo(tipo, 1024).is_ok());
        }
    }

    #[test]
    fn rejects_oversized_files() {
        let err = validar_archivo("application/pdf", MAX_FILE_SIZE + 1).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        // Exactly at the limit is still fine.
        assert!(validar_archivo("application/pdf", MAX_FILE_SIZE).is_ok());
    }

    #[test]
    fn rejects_unknown_content_types() {
        assert!(validar_archivo("image/gif", 10).is_err());
        assert!(validar_archivo("text/html", 10).is_err());
    }
}
