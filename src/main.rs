//! drive_index CLI - manage files in Google Drive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drive_index::auth::default_credentials_path;
use drive_index::{extract_id, Authenticator, DriveClient, DriveSession, FileRef, PermissionRole};

/// CLI tool for managing files in Google Drive.
#[derive(Parser)]
#[command(name = "drive_index")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", default_value_os_t = default_credentials_path())]
    credentials: PathBuf,

    /// Bearer token to use instead of the service account exchange.
    #[arg(long, env = "DRIVE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Log each remote operation.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the root folder.
    List,

    /// List a folder by URL or ID.
    Ls { folder: String },

    /// Print the ID of a file by title.
    Find {
        title: String,

        /// Search this folder instead of the root index.
        #[arg(long = "in")]
        folder: Option<String>,
    },

    /// Print the ID of a root-level folder by title.
    Folder { title: String },

    /// Print the parent folder ID of a file.
    Parent {
        /// File URL or ID, or a root-level title with --by-title.
        file: String,

        #[arg(long)]
        by_title: bool,
    },

    /// Upload a local file.
    Upload {
        path: PathBuf,

        /// Remote title (defaults to the local file name).
        #[arg(long)]
        title: Option<String>,

        /// Destination folder URL or ID (defaults to root).
        #[arg(long, short = 't')]
        to: Option<String>,
    },

    /// Download a file to local filesystem.
    Download {
        file: String,

        /// Local destination path (file or directory).
        #[arg(long, short = 't', default_value = ".")]
        to: PathBuf,
    },

    /// Rename a file and replace its content with text.
    Update {
        file: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },

    /// Create a folder.
    Mkdir {
        title: String,
        #[arg(long = "in")]
        parent: Option<String>,
    },

    /// Move a file to the trash.
    Trash { file: String },

    /// Restore a file from the trash.
    Untrash { file: String },

    /// Permanently delete a file.
    Delete { file: String },

    /// Share a file with a user.
    Share {
        file: String,
        email: String,
        #[arg(long, default_value_t = PermissionRole::Reader)]
        role: PermissionRole,
    },

    /// Revoke a user's access to a file.
    Unshare { file: String, email: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let auth = match cli.access_token {
        Some(token) => Authenticator::from_token(token),
        None => Authenticator::from_file(&cli.credentials)
            .with_context(|| format!("Failed to load credentials from {:?}", cli.credentials))?,
    };

    let session = DriveSession::connect(DriveClient::new(auth))
        .await
        .context("Failed to list the root folder")?;

    match cli.command {
        Commands::List => print_listing(session.index().entries()),

        Commands::Ls { folder } => {
            let folder_id = parse_id(&folder)?;
            let files = session
                .list_files_in_folder(&folder_id)
                .await
                .with_context(|| format!("Failed to list files in folder: {}", folder_id))?;
            print_listing(&files);
        }

        Commands::Find { title, folder } => {
            let id = match folder {
                Some(folder) => {
                    let folder_id = parse_id(&folder)?;
                    session.id_for_title_in_folder(&folder_id, &title).await?
                }
                None => session.id_for_title(&title),
            };
            print_found(id, &title)?;
        }

        Commands::Folder { title } => print_found(session.folder_id(&title), &title)?,

        Commands::Parent { file, by_title } => {
            let parent = if by_title {
                session.folder_of_file(FileRef::Title(&file)).await?
            } else {
                let file_id = parse_id(&file)?;
                session.folder_of_file(FileRef::Id(&file_id)).await?
            };
            print_found(parent, &file)?;
        }

        Commands::Upload { path, title, to } => {
            let title = match title {
                Some(title) => title,
                None => local_file_name(&path)?,
            };
            let file = match to {
                Some(folder) => {
                    let folder_id = parse_id(&folder)?;
                    session.upload_file_to_folder(&folder_id, &path, &title).await?
                }
                None => session.upload_file(&path, &title).await?,
            };
            println!("Uploaded file with ID {}", file.id);
        }

        Commands::Download { file, to } => {
            let file_id = parse_id(&file)?;
            ensure_parent_dir(&to)?;

            let (_, saved) = session
                .download_file(&file_id, &to)
                .await
                .with_context(|| format!("Failed to download file: {}", file_id))?;
            println!("Downloaded file to {}", saved.display());
        }

        Commands::Update {
            file,
            title,
            content,
        } => {
            let file_id = parse_id(&file)?;
            session.update_file(&file_id, &title, &content).await?;
            println!("Updated file with ID {}", file_id);
        }

        Commands::Mkdir { title, parent } => {
            let parent_id = parent.as_deref().map(parse_id).transpose()?;
            let folder = session.create_folder(&title, parent_id.as_deref()).await?;
            println!("Created folder with ID {}", folder.id);
        }

        Commands::Trash { file } => {
            let file_id = parse_id(&file)?;
            session.trash_file(&file_id).await?;
            println!("Trashed file with ID {}", file_id);
        }

        Commands::Untrash { file } => {
            let file_id = parse_id(&file)?;
            session.untrash_file(&file_id).await?;
            println!("Restored file with ID {}", file_id);
        }

        Commands::Delete { file } => {
            let file_id = parse_id(&file)?;
            session.delete_file(&file_id).await?;
            println!("Deleted file with ID {}", file_id);
        }

        Commands::Share { file, email, role } => {
            let file_id = parse_id(&file)?;
            session.share_file(&file_id, &email, role).await?;
            println!("Shared {} with {} as {}", file_id, email, role);
        }

        Commands::Unshare { file, email } => {
            let file_id = parse_id(&file)?;
            let removed = session.remove_file_permission(&file_id, &email).await?;
            println!("Removed {} permission(s) for {} on {}", removed, email, file_id);
        }
    }

    Ok(())
}

fn parse_id(input: &str) -> Result<String> {
    extract_id(input).with_context(|| format!("Invalid URL or ID: {}", input))
}

fn print_listing(files: &[drive_index::RemoteFile]) {
    if files.is_empty() {
        println!("No files found.");
        return;
    }

    println!("{:<44} {:>10} {:<30} {}", "ID", "SIZE", "TYPE", "TITLE");
    println!("{}", "-".repeat(100));
    for file in files {
        println!("{}", file);
    }
}

fn print_found(value: Option<String>, query: &str) -> Result<()> {
    match value {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => anyhow::bail!("Not found: {}", query),
    }
}

fn local_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Cannot derive a title from {:?}", path))
}

/// Create the directory a download will land in.
fn ensure_parent_dir(to: &Path) -> Result<()> {
    let dir = if to.is_dir() || to.to_string_lossy().ends_with('/') {
        Some(to)
    } else {
        to.parent().filter(|p| !p.as_os_str().is_empty())
    };

    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_name() {
        assert_eq!(local_file_name(Path::new("docs/report.pdf")).unwrap(), "report.pdf");
        assert!(local_file_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_cli_parses_share_role() {
        let cli = Cli::try_parse_from([
            "drive_index",
            "--access-token",
            "t",
            "share",
            "abc",
            "a@example.com",
            "--role",
            "writer",
        ])
        .unwrap();

        match cli.command {
            Commands::Share { role, .. } => assert_eq!(role, PermissionRole::Writer),
            _ => panic!("expected share"),
        }
    }

    #[test]
    fn test_cli_default_credentials_path() {
        let cli = Cli::try_parse_from(["drive_index", "list"]).unwrap();
        if std::env::var_os("GOOGLE_APPLICATION_CREDENTIALS").is_none() {
            assert_eq!(cli.credentials, default_credentials_path());
        }
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a/b/file.txt");
        ensure_parent_dir(&target).unwrap();
        assert!(tmp.path().join("a/b").is_dir());
    }
}
