//! Local filesystem operations with safety checks

use std::{
    fs,
    io,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::{
    capabilities::{CapabilityError, CapabilityReply, CapabilityResult, FileManager},
    config::JarvisConfig,
};

#[derive(Debug, Clone)]
pub struct LocalFileManager {
    enabled: bool,
    protected_paths: Vec<String>,
}

impl LocalFileManager {
    pub fn new(enabled: bool, protected_paths: Vec<String>) -> Self {
        Self {
            enabled,
            protected_paths: protected_paths
                .iter()
                .flat_map(|p| {
                    let resolved = canonical(Path::new(p)).to_string_lossy().into_owned();
                    [comparable(p), comparable(&resolved)]
                })
                .collect(),
        }
    }

    pub fn from_config(config: &JarvisConfig) -> Self {
        Self::new(
            config.features.file_operations,
            config.files.protected_paths.clone(),
        )
    }

    /// Expand `~` and make the path absolute
    pub fn normalize(path: &str) -> io::Result<PathBuf> {
        let path = path.trim();
        let expanded = match path.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
                let home = dirs::home_dir()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No home directory"))?;
                home.join(rest.trim_start_matches(['/', '\\']))
            }
            _ => PathBuf::from(path),
        };

        if expanded.is_absolute() {
            Ok(expanded)
        } else {
            Ok(std::env::current_dir()?.join(expanded))
        }
    }

    /// Absolute location of the entry `path` names: `.` and `..` are applied
    /// and symlinks in its parent directories followed, so the protected-path
    /// check sees where the operation actually lands. A final symlink is kept
    /// as is; deleting it removes the link, not its target.
    pub fn resolve(path: &str) -> io::Result<PathBuf> {
        let normalized = Self::normalize(path)?;
        Ok(match (normalized.parent(), normalized.file_name()) {
            (Some(parent), Some(name)) => canonical(parent).join(name),
            _ => canonical(&normalized),
        })
    }

    fn check(&self, path: &Path) -> Result<(), String> {
        if !self.enabled {
            return Err("File operations are disabled in settings. ⚠️".to_string());
        }

        let candidate = comparable(&path.to_string_lossy());
        let protected = self.protected_paths.iter().any(|p| {
            candidate == *p || candidate.starts_with(&format!("{}/", p.trim_end_matches('/')))
        });
        if protected {
            return Err(format!(
                "Cannot operate on system directory: {}",
                path.display()
            ));
        }
        Ok(())
    }

    fn copy_blocking(&self, source: &str, destination: &str) -> CapabilityReply {
        let (src, dst) = match self.resolve_pair(source, destination) {
            Ok(pair) => pair,
            Err(reply) => return reply,
        };

        let result = if src.is_file() {
            copy_file(&src, &dst).map(|dst| format!("Copied file to {}! 📄", file_name(&dst)))
        } else {
            copy_dir(&src, &dst).map(|dst| format!("Copied folder to {}! 📁", file_name(&dst)))
        };

        match result {
            Ok(message) => {
                tracing::info!("Copied: {} -> {}", src.display(), dst.display());
                CapabilityReply::ok(message)
            }
            Err(e) => {
                tracing::error!("Copy failed: {}", e);
                CapabilityReply::failed(format!("Couldn't copy: {}", e))
            }
        }
    }

    fn move_blocking(&self, source: &str, destination: &str) -> CapabilityReply {
        let (src, dst) = match self.resolve_pair(source, destination) {
            Ok(pair) => pair,
            Err(reply) => return reply,
        };

        match move_path(&src, &dst) {
            Ok(dst) => {
                tracing::info!("Moved: {} -> {}", src.display(), dst.display());
                CapabilityReply::ok(format!("Moved to {}! 🚀", file_name(&dst)))
            }
            Err(e) => {
                tracing::error!("Move failed: {}", e);
                CapabilityReply::failed(format!("Couldn't move: {}", e))
            }
        }
    }

    fn delete_blocking(&self, path: &str, confirm: bool) -> CapabilityReply {
        if !confirm {
            return CapabilityReply::failed(
                "Safety first! Please confirm deletion. 🛡️ Say 'confirm delete'",
            );
        }

        let target = match Self::resolve(path) {
            Ok(target) => target,
            Err(e) => return CapabilityReply::failed(format!("Couldn't delete: {}", e)),
        };
        if let Err(message) = self.check(&target) {
            return CapabilityReply::failed(message);
        }
        if !target.exists() {
            return CapabilityReply::failed(format!("Path doesn't exist: {}", path));
        }

        let result = if target.is_dir() {
            fs::remove_dir_all(&target).map(|_| format!("Deleted folder {}! 🗑️", file_name(&target)))
        } else {
            fs::remove_file(&target).map(|_| format!("Deleted {}! 🗑️", file_name(&target)))
        };

        match result {
            Ok(message) => {
                tracing::info!("Deleted: {}", target.display());
                CapabilityReply::ok(message)
            }
            Err(e) => {
                tracing::error!("Delete failed: {}", e);
                CapabilityReply::failed(format!("Couldn't delete: {}", e))
            }
        }
    }

    fn resolve_pair(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<(PathBuf, PathBuf), CapabilityReply> {
        let src = Self::resolve(source).map_err(|e| CapabilityReply::failed(e.to_string()))?;
        let dst =
            Self::resolve(destination).map_err(|e| CapabilityReply::failed(e.to_string()))?;

        self.check(&src).map_err(CapabilityReply::failed)?;
        self.check(&dst).map_err(CapabilityReply::failed)?;

        if !src.exists() {
            return Err(CapabilityReply::failed(format!(
                "Source doesn't exist: {}",
                source
            )));
        }
        Ok((src, dst))
    }

    async fn run<F>(&self, op: F) -> CapabilityResult
    where
        F: FnOnce(LocalFileManager) -> CapabilityReply + Send + 'static,
    {
        let manager = self.clone();
        tokio::task::spawn_blocking(move || op(manager))
            .await
            .map_err(|e| CapabilityError::Other(format!("File task failed: {}", e)))
    }
}

#[async_trait]
impl FileManager for LocalFileManager {
    async fn copy(&self, source: &str, destination: &str) -> CapabilityResult {
        let (source, destination) = (source.to_string(), destination.to_string());
        self.run(move |fm| fm.copy_blocking(&source, &destination))
            .await
    }

    async fn move_path(&self, source: &str, destination: &str) -> CapabilityResult {
        let (source, destination) = (source.to_string(), destination.to_string());
        self.run(move |fm| fm.move_blocking(&source, &destination))
            .await
    }

    async fn delete(&self, path: &str, confirm: bool) -> CapabilityResult {
        let path = path.to_string();
        self.run(move |fm| fm.delete_blocking(&path, confirm)).await
    }
}

/// Lowercased, forward-slash form used for protected path comparison
fn comparable(path: &str) -> String {
    let path = path.replace('\\', "/").to_lowercase();
    // canonicalize() on Windows returns verbatim `\\?\C:\...` paths
    match path.strip_prefix("//?/") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// Canonicalizes the deepest existing ancestor and applies the remaining
/// components lexically, so paths that do not exist yet still resolve
fn canonical(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        if let Ok(mut resolved) = ancestor.canonicalize() {
            let rest = path.strip_prefix(ancestor).unwrap_or_else(|_| Path::new(""));
            push_components(&mut resolved, rest);
            return resolved;
        }
    }

    let mut resolved = PathBuf::new();
    push_components(&mut resolved, path);
    resolved
}

fn push_components(base: &mut PathBuf, rest: &Path) {
    for component in rest.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                base.pop();
            }
            other => base.push(other.as_os_str()),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Copying or moving into an existing directory puts the source inside it
fn into_existing_dir(src: &Path, dst: &Path) -> PathBuf {
    match src.file_name() {
        Some(name) if dst.is_dir() => dst.join(name),
        _ => dst.to_path_buf(),
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn copy_file(src: &Path, dst: &Path) -> io::Result<PathBuf> {
    let dst = into_existing_dir(src, dst);
    ensure_parent(&dst)?;
    fs::copy(src, &dst)?;
    Ok(dst)
}

fn copy_dir(src: &Path, dst: &Path) -> io::Result<PathBuf> {
    let dst = into_existing_dir(src, dst);

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            ensure_parent(&target)?;
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(dst)
}

fn move_path(src: &Path, dst: &Path) -> io::Result<PathBuf> {
    let dst = into_existing_dir(src, dst);
    ensure_parent(&dst)?;

    match fs::rename(src, &dst) {
        Ok(()) => Ok(dst),
        // Rename cannot cross filesystems; fall back to copy and remove
        Err(_) => {
            if src.is_dir() {
                copy_dir(src, &dst)?;
                fs::remove_dir_all(src)?;
            } else {
                fs::copy(src, &dst)?;
                fs::remove_file(src)?;
            }
            Ok(dst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> LocalFileManager {
        LocalFileManager::new(true, vec!["/etc".to_string(), "C:\\Windows".to_string()])
    }

    fn path_str(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_copy_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("notes.txt");
        fs::write(&src, "hello").unwrap();
        let dst = dir.path().join("backup").join("notes-copy.txt");

        let reply = manager()
            .copy(&path_str(&src), &path_str(&dst))
            .await
            .unwrap();

        assert!(reply.success, "{}", reply.message);
        assert_eq!(reply.message, "Copied file to notes-copy.txt! 📄");
        assert_eq!(fs::read_to_string(&dst).unwrap(), "hello");
        assert!(src.exists());
    }

    #[tokio::test]
    async fn test_copy_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("project");
        fs::create_dir_all(src.join("src")).unwrap();
        fs::write(src.join("src").join("main.rs"), "fn main() {}").unwrap();
        let dst = dir.path().join("archive");
        fs::create_dir_all(&dst).unwrap();

        let reply = manager()
            .copy(&path_str(&src), &path_str(&dst))
            .await
            .unwrap();

        assert!(reply.success, "{}", reply.message);
        assert!(dst.join("project").join("src").join("main.rs").exists());
    }

    #[tokio::test]
    async fn test_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("report.pdf");
        fs::write(&src, "pdf").unwrap();
        let dst = dir.path().join("docs");
        fs::create_dir_all(&dst).unwrap();

        let reply = manager()
            .move_path(&path_str(&src), &path_str(&dst))
            .await
            .unwrap();

        assert!(reply.success, "{}", reply.message);
        assert_eq!(reply.message, "Moved to report.pdf! 🚀");
        assert!(!src.exists());
        assert!(dst.join("report.pdf").exists());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = path_str(&dir.path().join("nope.txt"));

        let reply = manager()
            .copy(&src, &path_str(&dir.path().join("x.txt")))
            .await
            .unwrap();

        assert!(!reply.success);
        assert_eq!(reply.message, format!("Source doesn't exist: {}", src));
    }

    #[tokio::test]
    async fn test_delete_requires_confirm() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("temp.txt");
        fs::write(&target, "x").unwrap();

        let reply = manager().delete(&path_str(&target), false).await.unwrap();
        assert!(!reply.success);
        assert!(target.exists());

        let reply = manager().delete(&path_str(&target), true).await.unwrap();
        assert!(reply.success, "{}", reply.message);
        assert_eq!(reply.message, "Deleted temp.txt! 🗑️");
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_protected_paths_are_refused() {
        let reply = manager().delete("/etc/hosts", true).await.unwrap();
        assert!(!reply.success);
        assert!(reply.message.starts_with("Cannot operate on system directory"));
    }

    #[tokio::test]
    async fn test_disabled_manager_refuses_everything() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.txt");
        fs::write(&target, "x").unwrap();

        let manager = LocalFileManager::new(false, Vec::new());
        let reply = manager.delete(&path_str(&target), true).await.unwrap();

        assert!(!reply.success);
        assert_eq!(reply.message, "File operations are disabled in settings. ⚠️");
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_parent_segments_cannot_reach_protected_dir() {
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::create_dir_all(dir.path().join("other")).unwrap();
        let secret = locked.join("f.txt");
        fs::write(&secret, "keep").unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "n").unwrap();
        let manager = LocalFileManager::new(true, vec![path_str(&locked)]);

        let sneaky = path_str(&dir.path().join("other").join("..").join("locked").join("f.txt"));
        let reply = manager.delete(&sneaky, true).await.unwrap();
        assert!(!reply.success);
        assert!(reply.message.starts_with("Cannot operate on system directory"));
        assert!(secret.exists());

        let into_locked = path_str(&dir.path().join("other").join("..").join("locked"));
        let reply = manager.copy(&path_str(&notes), &into_locked).await.unwrap();
        assert!(!reply.success);
        assert!(!locked.join("notes.txt").exists());
    }

    #[test]
    fn test_resolve_applies_parent_segments() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        let base = dir.path().canonicalize().unwrap();

        let resolved =
            LocalFileManager::resolve(&path_str(&dir.path().join("a").join("..").join("new.txt")))
                .unwrap();
        assert_eq!(resolved, base.join("new.txt"));

        let missing = LocalFileManager::resolve(&path_str(
            &dir.path().join("x").join("y").join("..").join("z.txt"),
        ))
        .unwrap();
        assert_eq!(missing, base.join("x").join("z.txt"));
    }

    #[test]
    fn test_protected_prefix_is_path_aware() {
        let manager = manager();
        assert!(manager.check(Path::new("/etc")).is_err());
        assert!(manager.check(Path::new("/etc/passwd")).is_err());
        assert!(manager.check(Path::new("/etcetera/file")).is_ok());
    }

    #[test]
    fn test_normalize_expands_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            LocalFileManager::normalize("~/Documents").unwrap(),
            home.join("Documents")
        );
        assert!(LocalFileManager::normalize("relative.txt")
            .unwrap()
            .is_absolute());
    }
}
