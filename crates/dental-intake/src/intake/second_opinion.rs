use mime::Mime;
use serde::{Deserialize, Serialize};

use super::contact::ContactDetails;

pub const MAX_DOCUMENTS: usize = 10;
pub const MAX_DOCUMENT_BYTES: u64 = 15 * 1024 * 1024;

const DICOM: &str = "application/dicom";

/// Metadata for a file the browser already pushed to object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub file_name: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Second-opinion request: patient contact plus prior treatment plans or radiographs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondOpinionRequest {
    pub contact: ContactDetails,
    #[serde(default)]
    pub notes: Option<String>,
    pub documents: Vec<UploadDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("at least one document is required")]
    NoDocuments,
    #[error("at most 10 documents may be attached (found {0})")]
    TooManyDocuments(usize),
    #[error("'{0}' is empty")]
    EmptyFile(String),
    #[error("'{name}' is {size} bytes, above the 15 MiB limit")]
    FileTooLarge { name: String, size: u64 },
    #[error("'{name}' has unsupported type {content_type}")]
    UnsupportedType { name: String, content_type: String },
}

/// A document accepted for review, with its inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedDocument {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub storage_key: String,
}

pub fn validate_documents(
    ticket_id: &str,
    documents: &[UploadDescriptor],
) -> Result<Vec<AcceptedDocument>, UploadError> {
    if documents.is_empty() {
        return Err(UploadError::NoDocuments);
    }
    if documents.len() > MAX_DOCUMENTS {
        return Err(UploadError::TooManyDocuments(documents.len()));
    }

    documents
        .iter()
        .enumerate()
        .map(|(index, document)| accept(ticket_id, index, document))
        .collect()
}

/// Wizard photos follow the document limits but must be JPEG, PNG or WebP images.
pub fn validate_photo(photo: &UploadDescriptor) -> Result<String, UploadError> {
    check_size(photo)?;
    let content_type = resolve_content_type(photo);
    if !is_image(&content_type) {
        return Err(UploadError::UnsupportedType {
            name: photo.file_name.clone(),
            content_type,
        });
    }
    Ok(content_type)
}

fn check_size(document: &UploadDescriptor) -> Result<(), UploadError> {
    if document.size_bytes == 0 {
        return Err(UploadError::EmptyFile(document.file_name.clone()));
    }
    if document.size_bytes > MAX_DOCUMENT_BYTES {
        return Err(UploadError::FileTooLarge {
            name: document.file_name.clone(),
            size: document.size_bytes,
        });
    }
    Ok(())
}

fn accept(
    ticket_id: &str,
    index: usize,
    document: &UploadDescriptor,
) -> Result<AcceptedDocument, UploadError> {
    check_size(document)?;

    let content_type = resolve_content_type(document);
    if !is_supported(&content_type) {
        return Err(UploadError::UnsupportedType {
            name: document.file_name.clone(),
            content_type,
        });
    }

    Ok(AcceptedDocument {
        file_name: document.file_name.clone(),
        content_type,
        size_bytes: document.size_bytes,
        storage_key: format!(
            "second-opinion/{ticket_id}/{index:02}-{}",
            sanitize_file_name(&document.file_name)
        ),
    })
}

/// Declared type wins; otherwise guess from the extension. `.dcm` is not in the mime table.
fn resolve_content_type(document: &UploadDescriptor) -> String {
    if let Some(declared) = document
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return declared.to_ascii_lowercase();
    }

    let lower = document.file_name.to_ascii_lowercase();
    if lower.ends_with(".dcm") || lower.ends_with(".dicom") {
        return DICOM.to_string();
    }

    mime_guess::from_path(&lower)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn is_supported(content_type: &str) -> bool {
    if content_type == DICOM || is_image(content_type) {
        return true;
    }

    content_type
        .parse::<Mime>()
        .map(|parsed| parsed.essence_str() == mime::APPLICATION_PDF.essence_str())
        .unwrap_or(false)
}

fn is_image(content_type: &str) -> bool {
    let Ok(parsed) = content_type.parse::<Mime>() else {
        return false;
    };

    parsed.essence_str() == mime::IMAGE_JPEG.essence_str()
        || parsed.essence_str() == mime::IMAGE_PNG.essence_str()
        || parsed.essence_str() == "image/webp"
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}
