//! services/api/src/web/upload.rs
//!
//! Reads a whole multipart/form-data request into memory.

use axum::{extract::Multipart, http::StatusCode};
use bytes::Bytes;
use std::collections::HashMap;
use std::str::FromStr;

/// A file part of the form.
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub data: Bytes,
}

/// All parts of a submitted form, split into files and text fields.
#[derive(Default)]
pub struct UploadForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, (StatusCode, String)> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read multipart data: {}", e),
            )
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let data = field.bytes().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read field '{}': {}", name, e),
                )
            })?;

            if file_name.is_some() {
                form.files.insert(name, UploadedFile { file_name, data });
            } else {
                let text = String::from_utf8(data.to_vec()).map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Field '{}' is not valid UTF-8 text", name),
                    )
                })?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Removes and returns a non-empty file part.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).filter(|f| !f.data.is_empty())
    }

    /// A text field, trimmed; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Parses an optional text field.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, (StatusCode, String)> {
        self.text(name)
            .map(|raw| {
                raw.parse::<T>().map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Field '{}' has an invalid value '{}'", name, raw),
                    )
                })
            })
            .transpose()
    }
}

impl UploadedFile {
    /// Decodes the file as UTF-8 text.
    pub fn into_text(self) -> Result<String, (StatusCode, String)> {
        String::from_utf8(self.data.to_vec()).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!(
                    "Uploaded file '{}' is not valid UTF-8 text: {}",
                    self.file_name.as_deref().unwrap_or("upload"),
                    e
                ),
            )
        })
    }
}
