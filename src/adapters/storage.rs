use crate::domain::ports::Storage;
use crate::utils::error::{PagesError, Result};
use std::path::{Component, Path, PathBuf};

/// Site files on the local filesystem, rooted at the output directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(PagesError::ProcessingError {
                message: format!("refusing to write outside the site directory: {}", path),
            });
        }
        Ok(Path::new(&self.base_path).join(relative))
    }
}

/// The working directory, its ancestors and the filesystem root are never wiped.
fn ensure_clearable(path: &Path) -> Result<()> {
    let refuse = || PagesError::ConfigError {
        message: format!(
            "refusing to clear '{}': it is the working directory or one of its parents",
            path.display()
        ),
    };

    if path.as_os_str().is_empty() || path.parent().is_none() {
        return Err(refuse());
    }

    if let (Ok(target), Ok(cwd)) = (path.canonicalize(), std::env::current_dir()) {
        if cwd.starts_with(&target) {
            return Err(refuse());
        }
    }
    Ok(())
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        Ok(tokio::fs::read(full_path).await?)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let root = Path::new(&self.base_path);
        ensure_clearable(root)?;

        match tokio::fs::remove_dir_all(root).await {
            Ok(()) => tracing::debug!("Removed previous site directory {}", root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(root).await?;
        Ok(())
    }

    fn root(&self) -> &str {
        &self.base_path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEntry {
    /// Path relative to the walked root, `/`-separated.
    pub path: String,
    pub size: u64,
}

/// Every regular file under `root`, sorted by path. Symlinks to files count as
/// files. `.git` directories and symlinked directories are skipped.
pub async fn walk_files(root: impl AsRef<Path>) -> Result<Vec<SiteEntry>> {
    let root = root.as_ref();
    let mut entries = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();
            if file_type.is_dir() {
                if entry.file_name() != ".git" {
                    pending.push(path);
                }
            } else if file_type.is_file() {
                entries.push(SiteEntry {
                    path: relative_path(root, &path),
                    size: entry.metadata().await?.len(),
                });
            } else if file_type.is_symlink() {
                // Links to files are followed. Linked directories could cycle.
                match tokio::fs::metadata(&path).await {
                    Ok(target) if target.is_file() => entries.push(SiteEntry {
                        path: relative_path(root, &path),
                        size: target.len(),
                    }),
                    Ok(_) => tracing::warn!("Skipping symlinked directory {}", path.display()),
                    Err(e) => tracing::warn!("Skipping broken symlink {}: {}", path.display(), e),
                }
            } else {
                tracing::debug!("Skipping special file {}", path.display());
            }
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Copies every file `walk_files` reports from `source` into `destination`.
pub async fn copy_tree(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<usize> {
    let source = source.as_ref();
    let destination = destination.as_ref();
    let files = walk_files(source).await?;

    for file in &files {
        let target = destination.join(&file.path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(source.join(&file.path), &target).await?;
    }

    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reset_clears_previous_output() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("site");
        let storage = LocalStorage::new(site.to_str().unwrap());

        storage.write_file("old/stale.html", b"old").await.unwrap();
        assert!(site.join("old/stale.html").exists());

        storage.reset().await.unwrap();
        assert!(site.exists());
        assert!(walk_files(&site).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_and_read_round_trip_nested() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("site").to_str().unwrap());

        storage.write_file("assets/app.css", b"body{}").await.unwrap();
        assert_eq!(storage.read_file("assets/app.css").await.unwrap(), b"body{}");
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_root() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("site").to_str().unwrap());

        assert!(storage.write_file("../escape.html", b"x").await.is_err());
        assert!(storage.write_file("/etc/passwd", b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_reset_refuses_working_directory() {
        let storage = LocalStorage::new(".");
        assert!(storage.reset().await.is_err());
        let root = LocalStorage::new("/");
        assert!(root.reset().await.is_err());
    }

    #[tokio::test]
    async fn test_walk_and_copy_tree() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        std::fs::create_dir_all(source.path().join("a/b")).unwrap();
        std::fs::create_dir_all(source.path().join(".git")).unwrap();
        std::fs::write(source.path().join("index.html"), "<html></html>").unwrap();
        std::fs::write(source.path().join("a/b/deep.txt"), "deep").unwrap();
        std::fs::write(source.path().join(".git/HEAD"), "ref").unwrap();

        let entries = walk_files(source.path()).await.unwrap();
        assert_eq!(
            entries,
            vec![
                SiteEntry { path: "a/b/deep.txt".to_string(), size: 4 },
                SiteEntry { path: "index.html".to_string(), size: 13 },
            ]
        );

        let copied = copy_tree(source.path(), destination.path()).await.unwrap();
        assert_eq!(copied, 2);
        assert_eq!(
            std::fs::read_to_string(destination.path().join("a/b/deep.txt")).unwrap(),
            "deep"
        );
        assert!(!destination.path().join(".git").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_follows_file_symlinks_only() {
        use std::os::unix::fs::symlink;

        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("shared.css"), "p{}").unwrap();
        std::fs::create_dir_all(outside.path().join("dir")).unwrap();

        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        std::fs::write(source.path().join("index.html"), "x").unwrap();
        symlink(outside.path().join("shared.css"), source.path().join("style.css")).unwrap();
        symlink(outside.path().join("dir"), source.path().join("linked-dir")).unwrap();
        symlink(outside.path().join("missing"), source.path().join("broken")).unwrap();

        let entries = walk_files(source.path()).await.unwrap();
        assert_eq!(
            entries,
            vec![
                SiteEntry { path: "index.html".to_string(), size: 1 },
                SiteEntry { path: "style.css".to_string(), size: 3 },
            ]
        );

        assert_eq!(copy_tree(source.path(), destination.path()).await.unwrap(), 2);
        assert_eq!(
            std::fs::read_to_string(destination.path().join("style.css")).unwrap(),
            "p{}"
        );
    }
}
