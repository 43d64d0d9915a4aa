//! drive_index - Google Drive access with a cached title index.
//!
//! This library provides:
//! - A [`DriveSession`] holding an authenticated client and an immutable
//!   title↔id snapshot of the root folder
//! - Folder-scoped lookups that query Drive directly
//! - Upload, download, update, trash, delete, folder creation and sharing
//!
//! # Example
//!
//! ```no_run
//! use drive_index::{Authenticator, DriveClient, DriveSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::from_file(drive_index::auth::default_credentials_path())?;
//!     let session = DriveSession::connect(DriveClient::new(auth)).await?;
//!
//!     if let Some(id) = session.folder_id("Docs") {
//!         for file in session.list_files_in_folder(&id).await? {
//!             println!("{}", file);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod index;
pub mod models;
pub mod session;
pub mod url_parser;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use index::FileIndex;
pub use models::{PermissionRole, RemoteFile, FOLDER_MIME_TYPE};
pub use session::{DriveSession, FileRef};
pub use url_parser::extract_id;
