pub mod error;
pub mod path;

pub use error::VfsError;
pub use path::{clean_virtual_path, join_virtual};

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::{self, File};

use crate::core_auth::{check_permission, AuthError, Permission};
use crate::users::User;

/// One directory entry as seen through the virtual filesystem.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub mtime: SystemTime,
    pub is_dir: bool,
}

/// The virtual filesystem: translates user-relative virtual paths into host
/// paths confined to the user's sub-tree of the data root, and performs the
/// actual host I/O. Every operation re-checks the permission gate before
/// touching the disk.
pub struct Vfs {
    data_root: PathBuf,
}

impl Vfs {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// Host directory a user's virtual namespace is rooted at.
    fn user_root(&self, user: &User) -> PathBuf {
        let home = user.home();
        if home == "/" {
            self.data_root.clone()
        } else {
            self.data_root.join(home.trim_start_matches('/'))
        }
    }

    /// Maps a virtual path to a host path. The cleaned path is joined under
    /// the data root and the result is verified to sit lexically inside the
    /// user's sub-tree; the gate has already enforced this, the check here
    /// backstops it.
    fn resolve(&self, user: &User, virtual_path: &str) -> Result<PathBuf, VfsError> {
        let cleaned = clean_virtual_path(virtual_path);

        let host = if cleaned == "/" {
            self.data_root.clone()
        } else {
            self.data_root.join(cleaned.trim_start_matches('/'))
        };

        if !host.starts_with(self.user_root(user)) {
            return Err(AuthError::OutsideHome {
                path: cleaned,
                home: user.home().to_string(),
            }
            .into());
        }

        Ok(host)
    }

    /// Lists a directory. Entries that cannot be stat-ed are skipped rather
    /// than failing the whole listing.
    pub async fn list(&self, user: &User, virtual_path: &str) -> Result<Vec<FileEntry>, VfsError> {
        check_permission(Some(user), virtual_path, Permission::List)?;
        let dir = self.resolve(user, virtual_path)?;

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                size: metadata.len(),
                mtime: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                is_dir: metadata.is_dir(),
            });
        }

        Ok(entries)
    }

    /// Opens a file for reading. Directories are rejected.
    pub async fn open_read(&self, user: &User, virtual_path: &str) -> Result<File, VfsError> {
        check_permission(Some(user), virtual_path, Permission::Read)?;
        let path = self.resolve(user, virtual_path)?;

        let metadata = fs::metadata(&path).await?;
        if metadata.is_dir() {
            return Err(VfsError::IsDirectory);
        }

        Ok(File::open(&path).await?)
    }

    /// Opens a file for writing, creating it (and any missing parent
    /// directories) or truncating an existing one.
    pub async fn open_write(&self, user: &User, virtual_path: &str) -> Result<File, VfsError> {
        check_permission(Some(user), virtual_path, Permission::Write)?;
        let path = self.resolve(user, virtual_path)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        Ok(File::create(&path).await?)
    }

    pub async fn delete(&self, user: &User, virtual_path: &str) -> Result<(), VfsError> {
        check_permission(Some(user), virtual_path, Permission::Delete)?;
        let path = self.resolve(user, virtual_path)?;
        fs::remove_file(&path).await?;
        Ok(())
    }

    /// Creates a directory, including missing parents.
    pub async fn mkdir(&self, user: &User, virtual_path: &str) -> Result<(), VfsError> {
        check_permission(Some(user), virtual_path, Permission::Write)?;
        let path = self.resolve(user, virtual_path)?;
        fs::create_dir_all(&path).await?;
        Ok(())
    }

    /// Removes a directory. Non-recursive: a populated directory fails.
    pub async fn rmdir(&self, user: &User, virtual_path: &str) -> Result<(), VfsError> {
        check_permission(Some(user), virtual_path, Permission::Delete)?;
        let path = self.resolve(user, virtual_path)?;
        fs::remove_dir(&path).await?;
        Ok(())
    }

    pub async fn stat(&self, user: &User, virtual_path: &str) -> Result<FileEntry, VfsError> {
        check_permission(Some(user), virtual_path, Permission::Read)?;
        let path = self.resolve(user, virtual_path)?;

        let metadata = fs::metadata(&path).await?;
        Ok(FileEntry {
            name: file_name(&path),
            size: metadata.len(),
            mtime: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir: metadata.is_dir(),
        })
    }

    /// Size of a regular file; directories are rejected.
    pub async fn size(&self, user: &User, virtual_path: &str) -> Result<u64, VfsError> {
        let entry = self.stat(user, virtual_path).await?;
        if entry.is_dir {
            return Err(VfsError::IsDirectory);
        }
        Ok(entry.size)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "/".to_string())
}
