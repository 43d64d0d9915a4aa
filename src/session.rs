//! Drive session: an authenticated client plus the current root index.
//!
//! The index is only rebuilt by [`DriveSession::refresh`]. Uploads, deletes
//! and updates leave it untouched, so it can go stale until the next refresh.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::client::{DriveClient, ROOT_FOLDER};
use crate::error::Result;
use crate::index::FileIndex;
use crate::models::{Permission, PermissionRole, RemoteFile};

/// How a caller identifies a file when the id is not at hand.
#[derive(Debug, Clone, Copy)]
pub enum FileRef<'a> {
    Id(&'a str),
    /// Resolved through the current root index.
    Title(&'a str),
}

/// Context object every Drive operation goes through.
pub struct DriveSession {
    client: DriveClient,
    index: Arc<FileIndex>,
}

impl DriveSession {
    /// Wrap a client and build the initial root index.
    pub async fn connect(client: DriveClient) -> Result<Self> {
        let mut session = Self::with_index(client, FileIndex::default());
        session.refresh().await?;
        Ok(session)
    }

    /// Wrap a client with an already built index; no network call.
    pub fn with_index(client: DriveClient, index: FileIndex) -> Self {
        Self {
            client,
            index: Arc::new(index),
        }
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    /// The current snapshot.
    pub fn index(&self) -> Arc<FileIndex> {
        Arc::clone(&self.index)
    }

    /// Re-list the root folder and replace the index.
    ///
    /// The new snapshot is swapped in only once the full listing arrived; on
    /// error the previous one stays current.
    pub async fn refresh(&mut self) -> Result<Arc<FileIndex>> {
        let listing = self.client.list_children(ROOT_FOLDER).await?;
        let index = Arc::new(FileIndex::from_listing(listing));
        debug!(entries = index.len(), "root index refreshed");
        self.index = Arc::clone(&index);
        Ok(index)
    }

    pub fn id_for_title(&self, title: &str) -> Option<String> {
        self.index.id_for_title(title).map(str::to_owned)
    }

    pub fn title_for_id(&self, id: &str) -> Option<String> {
        self.index.title_for_id(id).map(str::to_owned)
    }

    /// Folder lookup against the root snapshot only; nested folders are not seen.
    pub fn folder_id(&self, title: &str) -> Option<String> {
        self.index.folder_id(title).map(str::to_owned)
    }

    pub fn folder_title(&self, id: &str) -> Option<String> {
        self.index.folder_title(id).map(str::to_owned)
    }

    /// Children of `folder_id`, fetched fresh.
    pub async fn list_files_in_folder(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        self.client.list_children(folder_id).await
    }

    /// Id of the first child of `folder_id` titled `title`, in listing order.
    ///
    /// Bypasses the index and queries the folder every time.
    ///
    /// # Arguments
    /// * `folder_id` - The ID of the folder to search
    /// * `title` - Exact title to match
    pub async fn id_for_title_in_folder(
        &self,
        folder_id: &str,
        title: &str,
    ) -> Result<Option<String>> {
        let files = self.client.list_children(folder_id).await?;
        Ok(files.into_iter().find(|f| f.title == title).map(|f| f.id))
    }

    /// Title of the child of `folder_id` with id `file_id`.
    pub async fn title_for_id_in_folder(
        &self,
        folder_id: &str,
        file_id: &str,
    ) -> Result<Option<String>> {
        let files = self.client.list_children(folder_id).await?;
        Ok(files.into_iter().find(|f| f.id == file_id).map(|f| f.title))
    }

    /// First parent folder id of a file.
    ///
    /// A title unknown to the index yields `None` without a remote call.
    pub async fn folder_of_file(&self, file: FileRef<'_>) -> Result<Option<String>> {
        let file_id = match file {
            FileRef::Id(id) => id.to_string(),
            FileRef::Title(title) => match self.id_for_title(title) {
                Some(id) => id,
                None => return Ok(None),
            },
        };

        let metadata = self.client.get_file(&file_id).await?;
        Ok(metadata.parent().map(str::to_owned))
    }

    /// Upload a local file to the root folder.
    pub async fn upload_file(&self, local_path: &Path, title: &str) -> Result<RemoteFile> {
        let file = self.client.upload_file(local_path, title, None).await?;
        info!(id = %file.id, "uploaded file");
        Ok(file)
    }

    /// Upload a local file into a folder.
    ///
    /// # Arguments
    /// * `folder_id` - ID of the destination folder
    /// * `local_path` - Path to the local file
    /// * `title` - Title the file gets on Drive
    pub async fn upload_file_to_folder(
        &self,
        folder_id: &str,
        local_path: &Path,
        title: &str,
    ) -> Result<RemoteFile> {
        let file = self
            .client
            .upload_file(local_path, title, Some(folder_id))
            .await?;
        info!(id = %file.id, folder = folder_id, "uploaded file to folder");
        Ok(file)
    }

    pub async fn download_file(
        &self,
        file_id: &str,
        destination: &Path,
    ) -> Result<(RemoteFile, PathBuf)> {
        let (file, path) = self.client.download_file(file_id, destination).await?;
        info!(id = file_id, path = %path.display(), "downloaded file");
        Ok((file, path))
    }

    /// Download by id; Drive ids are global, so `folder_id` does not change the request.
    pub async fn download_file_from_folder(
        &self,
        folder_id: &str,
        file_id: &str,
        destination: &Path,
    ) -> Result<(RemoteFile, PathBuf)> {
        debug!(folder = folder_id, "downloading from folder");
        self.download_file(file_id, destination).await
    }

    /// Permanently delete a file in one call.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.client.delete_file(file_id).await?;
        info!(id = file_id, "deleted file");
        Ok(())
    }

    /// Move a file to the trash; reversible with [`DriveSession::untrash_file`].
    pub async fn trash_file(&self, file_id: &str) -> Result<RemoteFile> {
        let file = self.client.set_trashed(file_id, true).await?;
        info!(id = file_id, "trashed file");
        Ok(file)
    }

    pub async fn untrash_file(&self, file_id: &str) -> Result<RemoteFile> {
        let file = self.client.set_trashed(file_id, false).await?;
        info!(id = file_id, "restored file from trash");
        Ok(file)
    }

    /// Rename a file and replace its content with text.
    pub async fn update_file(
        &self,
        file_id: &str,
        new_title: &str,
        new_content: &str,
    ) -> Result<RemoteFile> {
        let file = self
            .client
            .update_file(file_id, new_title, new_content)
            .await?;
        info!(id = file_id, "updated file");
        Ok(file)
    }

    /// Same remote call as [`DriveSession::update_file`].
    ///
    /// # Arguments
    /// * `folder_id` - Folder the file lives in, only logged
    /// * `file_id` - The ID of the file to update
    /// * `new_title` - Title to set
    /// * `new_content` - Text that replaces the current content
    pub async fn update_file_in_folder(
        &self,
        folder_id: &str,
        file_id: &str,
        new_title: &str,
        new_content: &str,
    ) -> Result<RemoteFile> {
        debug!(folder = folder_id, "updating file in folder");
        self.update_file(file_id, new_title, new_content).await
    }

    pub async fn create_folder(&self, title: &str, parent_id: Option<&str>) -> Result<RemoteFile> {
        let folder = self.client.create_folder(title, parent_id).await?;
        info!(id = %folder.id, "created folder");
        Ok(folder)
    }

    /// Grant `email` access to a file.
    ///
    /// # Arguments
    /// * `file_id` - The ID of the file to share
    /// * `email` - Address of the user receiving access
    /// * `role` - Access level; `Owner` transfers ownership
    pub async fn share_file(
        &self,
        file_id: &str,
        email: &str,
        role: PermissionRole,
    ) -> Result<Permission> {
        let permission = self
            .client
            .create_permission(file_id, &Permission::user(email, role))
            .await?;
        info!(id = file_id, email, %role, "shared file");
        Ok(permission)
    }

    /// Revoke every user permission `email` holds on a file. Returns how many were removed.
    pub async fn remove_file_permission(&self, file_id: &str, email: &str) -> Result<usize> {
        let permissions = self.client.list_permissions(file_id).await?;
        let mut removed = 0;

        for permission in permissions.iter().filter(|p| p.is_user(email)) {
            let Some(permission_id) = permission.id.as_deref() else {
                continue;
            };
            self.client.delete_permission(file_id, permission_id).await?;
            removed += 1;
        }

        info!(id = file_id, email, removed, "removed file permissions");
        Ok(removed)
    }
}
