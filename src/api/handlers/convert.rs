//! The upload-validate-convert-respond endpoint.

use crate::AppState;
use crate::api::models::convert::{ConversionSettings, ConvertResponse, TargetFormat};
use crate::convert::{self, ConvertOptions};
use crate::errors::{Error, Result};
use axum::{
    Json,
    extract::{Multipart, State},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// MIME types accepted for the upload. JFIF is a JPEG container, so everything
/// here decodes through the same path.
const ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/jfif"];

/// The upload spooled to request-scoped temporary storage.
///
/// The [`NamedTempFile`] is the guaranteed-release handle: dropping it on any
/// exit path (validation failure, conversion error, success) removes the file.
struct SpooledUpload {
    tmp: NamedTempFile,
    content_type: String,
    file_name: Option<String>,
    size: u64,
}

#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "convert",
    summary = "Convert an image",
    description = "Upload a JFIF/JPEG image and receive it re-encoded as progressive JPEG. \
                   The response embeds the output as a base64 data URL for preview and download.",
    request_body(
        content_type = "multipart/form-data",
        description = "File upload under the `file` field, with optional `targetFormat`, \
                       `quality`, `maintainSize`, `autoOrient`, and `removeMetadata` fields"
    ),
    responses(
        (status = 200, description = "Conversion succeeded", body = ConvertResponse),
        (status = 400, description = "Missing/oversize/unsupported/undecodable upload or bad field value"),
        (status = 405, description = "Method not allowed"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn convert_image(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<ConvertResponse>> {
    let max_file_size = state.config.upload.max_file_size;

    let mut upload: Option<SpooledUpload> = None;
    let mut target_format = TargetFormat::default();
    let mut quality = state.config.upload.default_quality;
    let mut maintain_size = true;
    let mut auto_orient = true;
    let mut remove_metadata = false;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {}", e),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                // Exactly one file is processed per request
                if upload.is_some() {
                    return Err(Error::MissingFile);
                }

                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                let file_name = field.file_name().map(|s| s.to_string());

                let mut tmp = new_spool_file(&state)?;
                let mut size = 0u64;

                // Stream chunks to the spool file, failing fast on oversize
                // uploads so the conversion pipeline is never invoked for them
                while let Some(chunk) = field.chunk().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read file chunk: {}", e),
                })? {
                    size += chunk.len() as u64;
                    if size > max_file_size {
                        warn!(size, max_file_size, "upload exceeds size limit, aborting");
                        return Err(Error::FileTooLarge { limit: max_file_size });
                    }
                    tmp.as_file_mut().write_all(&chunk).map_err(|e| Error::Internal {
                        operation: format!("spool upload to temporary storage: {}", e),
                    })?;
                }

                debug!(?file_name, content_type, size, "spooled upload");
                upload = Some(SpooledUpload {
                    tmp,
                    content_type,
                    file_name,
                    size,
                });
            }
            "targetFormat" => {
                target_format = read_text(field, "targetFormat")
                    .await?
                    .parse()
                    .map_err(|message| Error::BadRequest { message })?;
            }
            "quality" => {
                let value = read_text(field, "quality").await?;
                quality = value
                    .parse::<u8>()
                    .ok()
                    .filter(|q| (10..=100).contains(q))
                    .ok_or_else(|| Error::BadRequest {
                        message: format!("quality must be an integer between 10 and 100, got '{}'", value),
                    })?;
            }
            // String-encoded booleans: the literal "true" and nothing else
            "maintainSize" => maintain_size = read_text(field, "maintainSize").await? == "true",
            "autoOrient" => auto_orient = read_text(field, "autoOrient").await? == "true",
            "removeMetadata" => remove_metadata = read_text(field, "removeMetadata").await? == "true",
            _ => {
                // Ignore unknown fields (forward compatibility)
            }
        }
    }

    let upload = upload.ok_or(Error::MissingFile)?;

    if !ALLOWED_TYPES.contains(&upload.content_type.to_ascii_lowercase().as_str()) {
        return Err(Error::UnsupportedType {
            content_type: upload.content_type,
        });
    }

    if upload.size > max_file_size {
        return Err(Error::FileTooLarge { limit: max_file_size });
    }

    let data = tokio::fs::read(upload.tmp.path()).await.map_err(|e| {
        warn!("failed to read spooled upload back: {}", e);
        Error::EmptyOrMissingFile
    })?;
    if data.is_empty() {
        return Err(Error::EmptyOrMissingFile);
    }

    let opts = ConvertOptions {
        quality,
        maintain_size,
        auto_orient,
        remove_metadata,
    };

    // The pipeline is CPU-bound; keep it off the async workers
    let output = tokio::task::spawn_blocking(move || convert::convert(&data, &opts))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("run conversion task: {}", e),
        })??;

    let file_name = output_file_name(upload.file_name.as_deref(), target_format);
    let file_size = output.len() as u64;
    let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(&output));

    info!(
        file_name,
        input_bytes = upload.size,
        output_bytes = file_size,
        quality,
        %target_format,
        "converted upload"
    );

    // Cleanup is best-effort; the Drop impl covers every earlier exit path
    if let Err(e) = upload.tmp.close() {
        warn!("failed to remove spooled upload: {}", e);
    }

    Ok(Json(ConvertResponse {
        success: true,
        preview_url: data_url.clone(),
        download_url: data_url,
        file_name,
        file_size,
        original_format: upload.content_type,
        target_format,
        quality,
        settings: ConversionSettings {
            maintain_size,
            auto_orient,
            remove_metadata,
        },
    }))
}

/// Create the spool file, in the configured directory or the system default.
fn new_spool_file(state: &AppState) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("jfifconv-upload-");
    let result = match &state.config.upload.spool_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    };
    result.map_err(|e| Error::Internal {
        operation: format!("create temporary storage for upload: {}", e),
    })
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field.text().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to read {}: {}", name, e),
    })
}

/// Suggested output name: the upload's stem plus the target extension.
fn output_file_name(original: Option<&str>, target: TargetFormat) -> String {
    let stem = original
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("converted");
    format!("{}.{}", stem, target.extension())
}
