//! Route handlers and the HTTP mapping of conversion errors.

use super::form::render_index;
use super::AppState;
use crate::config::ConversionOptions;
use crate::convert::convert;
use crate::error::{ErrorKind, Tex2DocxError};
use crate::output::ConversionOutput;
use crate::pipeline::stage::UploadedDocument;
use crate::probe::{probe, ProbeReport};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

// ============================================================================
// Error Response
// ============================================================================

impl Tex2DocxError {
    /// HTTP status used when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ConverterTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            e => match e.kind() {
                ErrorKind::MissingInput => StatusCode::BAD_REQUEST,
                ErrorKind::ToolNotFound => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::ExternalTool => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Io | ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for Tex2DocxError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, kind = ?self.kind(), "{}", self);
        } else {
            tracing::warn!(status = %status, kind = ?self.kind(), "{}", self);
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Conversion failed: {self}\n"),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /health
pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/diagnostics
pub(super) async fn diagnostics(State(state): State<AppState>) -> Json<ProbeReport> {
    Json(probe(state.converter()).await)
}

/// GET /
///
/// The form is rendered with a fresh probe so installing the converter
/// shows up on the next page load.
pub(super) async fn index(State(state): State<AppState>) -> Html<String> {
    let report = probe(state.converter()).await;
    Html(render_index(&report, state.converter()))
}

/// POST /convert
///
/// Runs the whole pipeline inside the request and answers with the
/// converted file as an attachment.
pub(super) async fn convert_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, Tex2DocxError> {
    let form = read_form(multipart, state.server().max_upload_bytes).await?;
    tracing::debug!(
        file_name = ?form.upload.as_ref().and_then(|u| u.file_name.as_deref()),
        output_name = %form.options.output_base_name,
        mathml = form.options.use_math_markup,
        "Received conversion request"
    );

    let output = convert(form.upload, &form.options, state.converter()).await?;
    Ok(download_response(output))
}

// ============================================================================
// Helpers
// ============================================================================

struct ConvertForm {
    upload: Option<UploadedDocument>,
    options: ConversionOptions,
}

async fn read_form(mut multipart: Multipart, limit: usize) -> Result<ConvertForm, Tex2DocxError> {
    let mut form = ConvertForm {
        upload: None,
        options: ConversionOptions::default(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.is_empty());
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                // Browsers send an empty, unnamed part when no file was chosen.
                if bytes.is_empty() && file_name.is_none() {
                    continue;
                }
                form.upload = Some(UploadedDocument::new(bytes.to_vec(), file_name));
            }
            "output_name" => {
                form.options.output_base_name =
                    field.text().await.map_err(|e| multipart_error(e, limit))?;
            }
            "mathml" => {
                let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                form.options.use_math_markup =
                    parse_checkbox(&value).ok_or_else(|| Tex2DocxError::InvalidUpload {
                        reason: format!("'{value}' is not a valid value for mathml"),
                    })?;
            }
            other => {
                tracing::debug!("Ignoring unknown form field '{}'", other);
            }
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError, limit: usize) -> Tex2DocxError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Tex2DocxError::UploadTooLarge { limit }
    } else {
        Tex2DocxError::InvalidUpload {
            reason: e.body_text(),
        }
    }
}

fn download_response(output: ConversionOutput) -> Response {
    let disposition = content_disposition(&output.file_name);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, output.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.bytes,
    )
        .into_response()
}

/// Interpret an HTML checkbox / boolean form value.
///
/// Returns `None` for values that are neither truthy nor falsy.
pub fn parse_checkbox(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// `attachment` disposition with an ASCII fallback name and, when needed,
/// an RFC 5987 `filename*` carrying the exact UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            percent_encode(file_name)
        )
    }
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
