//! Multipart handling for the professional signup form and storage of the
//! uploaded verification document.

use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use actix_web::web;
use futures_util::StreamExt as _;

pub struct SignupDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct ProfessionalSignupForm {
    pub email: String,
    pub password: String,
    pub fullname: String,
    pub service_name: String,
    pub experience: String,
    pub address: String,
    pub pincode: String,
    pub document: Option<SignupDocument>,
}

/// Drains the multipart stream into the signup fields. Unknown parts are
/// ignored; an empty file part counts as no document.
pub async fn read_professional_signup(
    mut payload: Multipart,
) -> Result<ProfessionalSignupForm, actix_web::Error> {
    let mut form = ProfessionalSignupForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(|value| value.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            data.extend_from_slice(&chunk?);
        }

        match name.as_str() {
            "email" => form.email = text(data),
            "password" => form.password = String::from_utf8(data).unwrap_or_default(),
            "fullname" => form.fullname = text(data),
            "serviceName" => form.service_name = text(data),
            "experience" => form.experience = text(data),
            "address" => form.address = text(data),
            "pincode" => form.pincode = text(data),
            "document" => {
                if let Some(filename) = filename {
                    if !data.is_empty() {
                        form.document = Some(SignupDocument {
                            filename,
                            bytes: data,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

fn text(data: Vec<u8>) -> String {
    String::from_utf8(data).unwrap_or_default().trim().to_string()
}

/// Strips any path components and anything outside [A-Za-z0-9._-] from a
/// client-supplied filename.
pub fn secure_filename(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Writes the uploaded document under the uploads directory and returns the
/// path recorded on the professional row.
pub async fn store_document(
    dir: &Path,
    original_name: &str,
    bytes: Vec<u8>,
) -> actix_web::Result<PathBuf> {
    let path = dir.join(secure_filename(original_name));
    let dir = dir.to_path_buf();
    let file_path = path.clone();
    web::block(move || {
        std::fs::create_dir_all(&dir)?;
        std::fs::write(&file_path, &bytes)
    })
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(path)
}
