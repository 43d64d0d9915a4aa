//! Data models for Google Drive API v3 requests and responses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// MIME type Drive uses to mark an entry as a folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file or folder as reported by the Drive API.
///
/// Drive v3 calls the title `name`; it is not unique within a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    #[serde(rename = "name")]
    pub title: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

impl RemoteFile {
    /// Whether the entry carries the folder MIME type.
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// First parent folder, if the API exposed one.
    pub fn parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

// Drive encodes int64 fields as JSON strings.
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl fmt::Display for RemoteFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size_str = if self.is_folder() {
            "<dir>".to_string()
        } else {
            self.size.map(format_size).unwrap_or_else(|| "-".to_string())
        };
        let mime = self.mime_type.as_deref().unwrap_or("-");
        write!(f, "{:<44} {:>10} {:<30} {}", self.id, size_str, mime, self.title)
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Access level granted by a permission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionRole {
    #[default]
    Reader,
    Commenter,
    Writer,
    FileOrganizer,
    Organizer,
    Owner,
}

impl PermissionRole {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionRole::Reader => "reader",
            PermissionRole::Commenter => "commenter",
            PermissionRole::Writer => "writer",
            PermissionRole::FileOrganizer => "fileOrganizer",
            PermissionRole::Organizer => "organizer",
            PermissionRole::Owner => "owner",
        }
    }
}

impl fmt::Display for PermissionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reader" => Ok(PermissionRole::Reader),
            "commenter" => Ok(PermissionRole::Commenter),
            "writer" => Ok(PermissionRole::Writer),
            "fileOrganizer" => Ok(PermissionRole::FileOrganizer),
            "organizer" => Ok(PermissionRole::Organizer),
            "owner" => Ok(PermissionRole::Owner),
            other => Err(format!("unknown permission role: {}", other)),
        }
    }
}

/// A permission attached to a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: PermissionRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

impl Permission {
    /// A user-scoped grant for `email`.
    pub fn user(email: &str, role: PermissionRole) -> Self {
        Self {
            id: None,
            kind: "user".to_string(),
            role,
            email_address: Some(email.to_string()),
        }
    }

    /// Whether this is a user grant for `email`.
    pub fn is_user(&self, email: &str) -> bool {
        self.kind == "user" && self.email_address.as_deref() == Some(email)
    }
}

/// Response from the permissions.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionListResponse {
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Service account credentials from JSON file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}
