//! Google Drive API v3 client.
//!
//! Every method maps to one remote call (listing follows page tokens until
//! exhausted). Nothing here caches or retries; see [`crate::session`] for the
//! title index.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde_json::json;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{
    ApiErrorResponse, FileListResponse, Permission, PermissionListResponse, PermissionRole,
    RemoteFile, FOLDER_MIME_TYPE,
};

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Files above this size go through a resumable session (5 MiB).
const RESUMABLE_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Fields requested for single-file responses.
const FILE_FIELDS: &str = "id, name, mimeType, parents, size, webViewLink";

/// Fields requested for listings.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, parents, size, webViewLink)";

const PERMISSION_FIELDS: &str = "nextPageToken, permissions(id, type, role, emailAddress)";

/// Alias Drive accepts for the caller's root folder.
pub const ROOT_FOLDER: &str = "root";

/// Query selecting the non-trashed direct children of `parent_id`.
pub fn children_query(parent_id: &str) -> String {
    format!("'{}' in parents and trashed = false", escape_query_value(parent_id))
}

fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Turn a non-2xx response into an [`DriveError::ApiError`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return Err(DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }
    Err(DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    })
}

/// Last path component of a remote title, usable as a local file name.
fn local_name_for(title: &str) -> Result<&OsStr> {
    Path::new(title)
        .file_name()
        .ok_or_else(|| DriveError::InvalidFileName(title.to_string()))
}

/// `dir/name` -> `dir/.name.part`
fn partial_path(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path.with_file_name(format!(".{}.part", name))
}

async fn write_body(path: &Path, response: Response) -> Result<()> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Client for a user's (or service account's) Google Drive.
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    /// Create a client against the public Drive endpoints.
    pub fn new(auth: Authenticator) -> Self {
        Self::with_endpoints(auth, DRIVE_API_BASE, UPLOAD_API_BASE)
    }

    /// Create a client against custom endpoints (a proxy or a mock server).
    ///
    /// # Arguments
    /// * `auth` - Authenticator for obtaining access tokens
    /// * `api_base` - Base URL standing in for the Drive v3 API
    /// * `upload_base` - Base URL standing in for the upload endpoint
    pub fn with_endpoints(
        auth: Authenticator,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_base, file_id)
    }

    /// List the non-trashed direct children of a folder.
    pub async fn list_children(&self, parent_id: &str) -> Result<Vec<RemoteFile>> {
        self.query_files(&children_query(parent_id)).await
    }

    /// Query files using Drive query syntax, following every page.
    #[instrument(skip(self), level = "debug")]
    pub async fn query_files(&self, query: &str) -> Result<Vec<RemoteFile>> {
        let token = self.auth.get_access_token().await?;
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/files", self.api_base))
                .bearer_auth(&token)
                .query(&[
                    ("q", query),
                    ("spaces", "drive"),
                    ("supportsAllDrives", "true"),
                    ("includeItemsFromAllDrives", "true"),
                    ("fields", LIST_FIELDS),
                ]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = check_status(request.send().await?).await?;
            let page: FileListResponse = response.json().await?;
            debug!(count = page.files.len(), "received listing page");
            all_files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_files)
    }

    /// Get file metadata by ID.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_file(&self, file_id: &str) -> Result<RemoteFile> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .get(self.file_url(file_id))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", FILE_FIELDS)])
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Upload a local file under `title`, into `parent_id` or the root.
    ///
    /// Fails with [`DriveError::LocalFileNotFound`] before touching the
    /// network when `local_path` does not exist.
    ///
    /// # Arguments
    /// * `local_path` - Path to the local file
    /// * `title` - Title the file gets on Drive
    /// * `parent_id` - ID of the destination folder, `None` for the root
    #[instrument(skip(self), level = "debug")]
    pub async fn upload_file(
        &self,
        local_path: &Path,
        title: &str,
        parent_id: Option<&str>,
    ) -> Result<RemoteFile> {
        let file_size = match tokio::fs::metadata(local_path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(DriveError::LocalFileNotFound(local_path.to_path_buf())),
        };

        let mime_type = mime_guess::from_path(local_path)
            .first_or_octet_stream()
            .to_string();

        let mut metadata = json!({ "name": title });
        if let Some(parent) = parent_id {
            metadata["parents"] = json!([parent]);
        }

        if file_size > RESUMABLE_THRESHOLD {
            self.upload_resumable(local_path, metadata, file_size, &mime_type)
                .await
        } else {
            self.upload_multipart(local_path, metadata, title, &mime_type)
                .await
        }
    }

    async fn upload_multipart(
        &self,
        local_path: &Path,
        metadata: serde_json::Value,
        title: &str,
        mime_type: &str,
    ) -> Result<RemoteFile> {
        let token = self.auth.get_access_token().await?;
        let file_content = tokio::fs::read(local_path).await?;

        let form = Form::new()
            .part(
                "metadata",
                Part::text(metadata.to_string()).mime_str("application/json")?,
            )
            .part(
                "file",
                Part::bytes(file_content)
                    .file_name(title.to_string())
                    .mime_str(mime_type)?,
            );

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", FILE_FIELDS),
            ])
            .multipart(form)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    async fn upload_resumable(
        &self,
        local_path: &Path,
        metadata: serde_json::Value,
        file_size: u64,
        mime_type: &str,
    ) -> Result<RemoteFile> {
        let token = self.auth.get_access_token().await?;

        let init_response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true")])
            .header("X-Upload-Content-Type", mime_type)
            .header("X-Upload-Content-Length", file_size.to_string())
            .json(&metadata)
            .send()
            .await?;

        let init_response = check_status(init_response).await?;
        let session_url = init_response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DriveError::ApiError {
                status: init_response.status().as_u16(),
                message: "No upload URL in response".to_string(),
            })?
            .to_string();

        debug!(size = file_size, "streaming resumable upload");
        let file = File::open(local_path).await?;
        let response = self
            .http
            .put(&session_url)
            .header("Content-Type", mime_type)
            .header("Content-Length", file_size.to_string())
            .query(&[("fields", FILE_FIELDS)])
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Download a file's content to `destination`.
    ///
    /// A directory destination gets the last component of the remote title
    /// appended; titles with no usable file name are rejected. Content is
    /// written to a `.part` sibling and renamed into place once complete.
    ///
    /// # Arguments
    /// * `file_id` - The ID of the file to download
    /// * `destination` - The local path to save the file, or a directory
    #[instrument(skip(self), level = "debug")]
    pub async fn download_file(
        &self,
        file_id: &str,
        destination: &Path,
    ) -> Result<(RemoteFile, PathBuf)> {
        let metadata = self.get_file(file_id).await?;
        let final_path = if destination.is_dir() {
            destination.join(local_name_for(&metadata.title)?)
        } else {
            destination.to_path_buf()
        };

        let token = self.auth.get_access_token().await?;
        let response = self
            .http
            .get(self.file_url(file_id))
            .bearer_auth(&token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?;
        let response = check_status(response).await?;

        let partial = partial_path(&final_path);
        if let Err(e) = write_body(&partial, response).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        tokio::fs::rename(&partial, &final_path).await?;

        Ok((metadata, final_path))
    }

    /// Rename a file and replace its content with `new_content` (as text/plain).
    ///
    /// # Arguments
    /// * `file_id` - The ID of the file to update
    /// * `new_title` - Title to set
    /// * `new_content` - Text that replaces the current content
    #[instrument(skip(self, new_content), level = "debug")]
    pub async fn update_file(
        &self,
        file_id: &str,
        new_title: &str,
        new_content: &str,
    ) -> Result<RemoteFile> {
        let token = self.auth.get_access_token().await?;

        let form = Form::new()
            .part(
                "metadata",
                Part::text(json!({ "name": new_title }).to_string())
                    .mime_str("application/json")?,
            )
            .part(
                "file",
                Part::text(new_content.to_string()).mime_str("text/plain")?,
            );

        let response = self
            .http
            .patch(format!("{}/files/{}", self.upload_base, file_id))
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", FILE_FIELDS),
            ])
            .multipart(form)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Create a folder under `parent_id`, or the root.
    #[instrument(skip(self), level = "debug")]
    pub async fn create_folder(&self, title: &str, parent_id: Option<&str>) -> Result<RemoteFile> {
        let token = self.auth.get_access_token().await?;

        let mut metadata = json!({ "name": title, "mimeType": FOLDER_MIME_TYPE });
        if let Some(parent) = parent_id {
            metadata["parents"] = json!([parent]);
        }

        let response = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", FILE_FIELDS)])
            .json(&metadata)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Move a file into or out of the trash.
    #[instrument(skip(self), level = "debug")]
    pub async fn set_trashed(&self, file_id: &str, trashed: bool) -> Result<RemoteFile> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .patch(self.file_url(file_id))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", FILE_FIELDS)])
            .json(&json!({ "trashed": trashed }))
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Permanently delete a file, skipping the trash.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .delete(self.file_url(file_id))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// Attach a permission to a file.
    ///
    /// Owner grants are sent with `transferOwnership=true`.
    #[instrument(skip(self), level = "debug")]
    pub async fn create_permission(
        &self,
        file_id: &str,
        permission: &Permission,
    ) -> Result<Permission> {
        let token = self.auth.get_access_token().await?;

        let mut request = self
            .http
            .post(format!("{}/permissions", self.file_url(file_id)))
            .bearer_auth(&token)
            .query(&[
                ("supportsAllDrives", "true"),
                ("fields", "id, type, role, emailAddress"),
            ]);

        // Drive refuses owner grants unless the transfer is acknowledged.
        if permission.role == PermissionRole::Owner {
            request = request.query(&[("transferOwnership", "true")]);
        }

        let response = request.json(permission).send().await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// List every permission on a file.
    #[instrument(skip(self), level = "debug")]
    pub async fn list_permissions(&self, file_id: &str) -> Result<Vec<Permission>> {
        let token = self.auth.get_access_token().await?;
        let mut permissions = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/permissions", self.file_url(file_id)))
                .bearer_auth(&token)
                .query(&[("supportsAllDrives", "true"), ("fields", PERMISSION_FIELDS)]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: PermissionListResponse =
                check_status(request.send().await?).await?.json().await?;
            permissions.extend(page.permissions);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(permissions)
    }

    /// Remove one permission from a file.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_permission(&self, file_id: &str, permission_id: &str) -> Result<()> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .delete(format!("{}/permissions/{}", self.file_url(file_id), permission_id))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
