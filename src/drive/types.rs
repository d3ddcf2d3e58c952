//! Drive Object Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
pub const PRESENTATION_MIME: &str = "application/vnd.google-apps.presentation";

pub const PDF_MIME: &str = "application/pdf";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const TEXT_MIME: &str = "text/plain";

/// Identifier of the drive's top-level folder
pub const ROOT_ID: &str = "root";

/// What kind of content an object holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Binary,
    Document,
    Spreadsheet,
    Presentation,
    Folder,
}

impl ContentKind {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type {
            FOLDER_MIME => Self::Folder,
            DOCUMENT_MIME => Self::Document,
            SPREADSHEET_MIME => Self::Spreadsheet,
            PRESENTATION_MIME => Self::Presentation,
            _ => Self::Binary,
        }
    }

    /// Export format used when the caller does not pick one.
    /// `None` means the bytes are downloaded verbatim.
    pub fn default_export(&self) -> Option<&'static str> {
        match self {
            Self::Document | Self::Presentation => Some(PDF_MIME),
            Self::Spreadsheet => Some(XLSX_MIME),
            Self::Binary | Self::Folder => None,
        }
    }

    pub fn is_exportable(&self) -> bool {
        self.default_export().is_some()
    }
}

/// Snapshot of a remote file or folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Multi-parent: the hierarchy is a DAG
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    /// Drive reports sizes as decimal strings
    #[serde(
        default,
        deserialize_with = "size_from_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    /// Export candidates (metadata lookups only)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub export_links: BTreeMap<String, String>,
}

impl RemoteObject {
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_mime(&self.mime_type)
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == ContentKind::Folder
    }
}

fn size_from_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Text(String),
        Number(u64),
    }

    match Option::<Size>::deserialize(deserializer)? {
        Some(Size::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        Some(Size::Number(n)) => Ok(Some(n)),
        None => Ok(None),
    }
}

/// One page of a `files.list` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<RemoteObject>,
    pub next_page_token: Option<String>,
}

/// Metadata for a file or folder being created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewObject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub parents: Vec<String>,
}

/// Upload payload: text is sent as UTF-8
#[derive(Debug, Clone, PartialEq)]
pub enum UploadContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl UploadContent {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for UploadContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for UploadContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for UploadContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}
