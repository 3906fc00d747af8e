use bytes::Buf;
use futures_util::{pin_mut, TryStreamExt};
use log::{debug, warn};
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use warp::multipart::{FormData, Part};

use crate::mimetype_detector;
use crate::storage::{Storage, StorageArea};
use crate::upload::naming;
use crate::upload::{UploadError, UploadResult};

pub const IMAGE_FIELD: &str = "image";
pub const TITLE_FIELD: &str = "title";
pub const DESCRIPTION_FIELD: &str = "description";

/// An uploaded original written to the originals area, not yet processed.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub original_name: String,
    pub stored_name: String,
    pub path: PathBuf,
    pub content_type: String,
    pub size: u64,
}

impl StagedFile {
    /// Removes the staged original, logging instead of failing.
    pub async fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.path).await {
            warn!("Could not delete staged original {:?}: {}", self.path, e);
        }
    }
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    /// `None` when the request carried no file; callers treat that as a no-op.
    pub file: Option<StagedFile>,
}

/// Reads the multipart body, validating and staging the `image` part on disk.
///
/// The declared content type is checked before a single byte is written, and
/// an oversized file is removed as soon as it crosses `max_bytes`.
pub async fn read_upload_form(
    form: FormData,
    storage: &Storage,
    max_bytes: u64,
) -> UploadResult<UploadForm> {
    let mut upload = UploadForm::default();
    pin_mut!(form);

    loop {
        let part = match form.try_next().await {
            Ok(Some(part)) => part,
            Ok(None) => break,
            Err(e) => {
                discard_staged(&upload).await;
                return Err(UploadError::Multipart(e.to_string()));
            }
        };

        let name = part.name().to_string();
        let result = match name.as_str() {
            TITLE_FIELD => read_text(part).await.map(|text| upload.title = text),
            DESCRIPTION_FIELD => read_text(part).await.map(|text| upload.description = text),
            IMAGE_FIELD if upload.file.is_none() => stage_image(part, storage, max_bytes)
                .await
                .map(|staged| upload.file = staged),
            other => {
                debug!("Ignoring multipart field {:?}", other);
                drain(part).await
            }
        };

        if let Err(e) = result {
            discard_staged(&upload).await;
            return Err(e);
        }
    }

    upload.title = upload.title.trim().to_string();
    upload.description = upload.description.trim().to_string();
    Ok(upload)
}

async fn discard_staged(upload: &UploadForm) {
    if let Some(staged) = &upload.file {
        staged.discard().await;
    }
}

async fn read_text(part: Part) -> UploadResult<String> {
    let stream = part.stream();
    pin_mut!(stream);

    let mut bytes = Vec::new();
    while let Some(mut chunk) = stream
        .try_next()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        bytes.extend_from_slice(&chunk.copy_to_bytes(chunk.remaining()));
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn drain(part: Part) -> UploadResult<()> {
    let stream = part.stream();
    pin_mut!(stream);

    while stream
        .try_next()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
        .is_some()
    {}

    Ok(())
}

/// Streams the file part into the originals area.
///
/// Browsers submit an empty file input as a part with an empty filename; that
/// counts as no file at all.
async fn stage_image(
    part: Part,
    storage: &Storage,
    max_bytes: u64,
) -> UploadResult<Option<StagedFile>> {
    let original_name = part.filename().unwrap_or("").trim().to_string();
    if original_name.is_empty() {
        drain(part).await?;
        return Ok(None);
    }

    let content_type = part.content_type().unwrap_or("").to_string();
    if !mimetype_detector::is_accepted_upload(&content_type) {
        return Err(UploadError::UnsupportedType(content_type));
    }

    let stored_name = naming::original_filename(naming::timestamp_millis(), &original_name);
    let path = storage.path(StorageArea::Originals, &stored_name);

    let size = match write_part(part, &path, max_bytes).await {
        Ok(size) => size,
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(&path).await {
                debug!("Nothing to clean up at {:?}: {}", path, remove_err);
            }
            return Err(e);
        }
    };

    debug!(
        "Staged {:?} ({}, {} bytes) as {:?}",
        original_name, content_type, size, path
    );

    Ok(Some(StagedFile {
        original_name,
        stored_name,
        path,
        content_type,
        size,
    }))
}

async fn write_part(part: Part, path: &std::path::Path, max_bytes: u64) -> UploadResult<u64> {
    let mut file = File::create(path).await?;
    let stream = part.stream();
    pin_mut!(stream);

    let mut size: u64 = 0;
    while let Some(mut chunk) = stream
        .try_next()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let bytes = chunk.copy_to_bytes(chunk.remaining());
        size += bytes.len() as u64;
        if size > max_bytes {
            return Err(UploadError::TooLarge { limit: max_bytes });
        }
        file.write_all(&bytes).await?;
    }

    file.flush().await?;
    Ok(size)
}
