use crate::{config::Config, errors::ApiError};
use actix_multipart::{Field, Multipart};
use futures_util::TryStreamExt as _;
use sanitize_filename::sanitize;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// A file stored in the uploads directory by an upload handler.
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub stored_name: String,
    pub mime_type: String,
}

impl SavedFile {
    /// Removes the stored file again, for requests that fail after the upload
    /// was written.
    pub async fn discard(&self, cfg: &Config) {
        remove_upload(cfg, &self.stored_name).await;
    }
}

/// Best-effort removal of `name` from the uploads directory. Only the final
/// path component is used.
pub async fn remove_upload(cfg: &Config, name: &str) {
    let Some(file_name) = Path::new(name).file_name() else { return };
    match tokio::fs::remove_file(cfg.uploads_path().join(file_name)).await {
        Ok(()) => log::debug!("removed upload {name}"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("could not remove upload {name}: {e}"),
    }
}

/// Text parts of a multipart form plus the (single) file part, if any.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<SavedFile>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Reads a multipart payload. The part named `file_field` is stored on disk;
/// every other part is read as UTF-8 text. On error nothing stays on disk.
pub async fn read_upload_form(
    cfg: &Config,
    payload: Multipart,
    file_field: &str,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    if let Err(e) = fill_form(cfg, payload, file_field, &mut form).await {
        if let Some(file) = &form.file {
            file.discard(cfg).await;
        }
        return Err(e);
    }
    Ok(form)
}

async fn fill_form(
    cfg: &Config,
    mut payload: Multipart,
    file_field: &str,
    form: &mut UploadForm,
) -> Result<(), ApiError> {
    while let Some(field) = payload
        .try_next()
        .await
        .map_err(|_| ApiError::BadRequest("invalid multipart".into()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            if form.file.is_some() {
                return Err(ApiError::BadRequest(format!("only one {file_field} file allowed")));
            }
            form.file = Some(save_multipart_file(cfg, field).await?);
        } else {
            let bytes = read_field(field, cfg.max_upload_size).await?;
            let text = String::from_utf8(bytes)
                .map_err(|_| ApiError::BadRequest(format!("field {name} is not valid UTF-8")))?;
            form.fields.insert(name, text);
        }
    }
    Ok(())
}

async fn read_field(mut field: Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut data: Vec<u8> = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|_| ApiError::BadRequest("upload read error".into()))?
    {
        data.extend_from_slice(&chunk);
        if data.len() > limit {
            return Err(ApiError::BadRequest("file too large".into()));
        }
    }
    Ok(data)
}

pub async fn save_multipart_file(cfg: &Config, field: Field) -> Result<SavedFile, ApiError> {
    let original = field
        .content_disposition()
        .and_then(|cd| cd.get_filename().map(|s| s.to_string()))
        .unwrap_or_else(|| "upload.bin".into());
    let original_safe = sanitize(&original);
    let declared = field.content_type().map(|m| m.essence_str().to_string());

    let data = read_field(field, cfg.max_upload_size).await?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("empty file".into()));
    }
    let mime_type = declared
        .filter(|m| m != "application/octet-stream")
        .or_else(|| infer::get(&data).map(|t| t.mime_type().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let ext = Path::new(&original_safe)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("bin");
    let stored_name = format!("{}.{}", uuid::Uuid::new_v4(), ext);
    let path = cfg.uploads_path().join(&stored_name);
    if let Err(e) = write_new(&path, &data).await {
        remove_upload(cfg, &stored_name).await;
        return Err(e.into());
    }

    log::info!("stored upload {original_safe} as {stored_name} ({mime_type}, {} bytes)", data.len());
    Ok(SavedFile { stored_name, mime_type })
}

async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut f = tokio::fs::File::create(path).await?;
    f.write_all(data).await?;
    f.flush().await
}
