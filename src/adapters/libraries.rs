use crate::domain::ports::LibraryLinker;
use crate::utils::error::{DeployError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 在目的目錄建立指向 jar 的符號連結 (非 unix 平台改為複製)
#[derive(Debug, Clone, Default)]
pub struct FsLibraryLinker;

impl FsLibraryLinker {
    pub fn new() -> Self {
        Self
    }
}

impl LibraryLinker for FsLibraryLinker {
    fn link_to(&self, libraries: &[PathBuf], destination: &Path) -> Result<Vec<PathBuf>> {
        if libraries.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(destination)?;

        let mut linked = Vec::with_capacity(libraries.len());
        for library in libraries {
            let fail = |reason: String| DeployError::LibraryLink {
                path: library.clone(),
                reason,
            };

            let file_name = library
                .file_name()
                .ok_or_else(|| fail("path has no file name".to_string()))?;
            let source = fs::canonicalize(library).map_err(|e| fail(e.to_string()))?;
            let target = destination.join(file_name);

            if fs::symlink_metadata(&target).is_ok() {
                fs::remove_file(&target).map_err(|e| fail(e.to_string()))?;
            }
            link(&source, &target).map_err(|e| fail(e.to_string()))?;

            tracing::debug!("Linked {} -> {}", target.display(), source.display());
            linked.push(target);
        }

        Ok(linked)
    }
}

#[cfg(unix)]
fn link(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(not(unix))]
fn link(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::copy(source, target).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_link_libraries_into_web_inf_lib() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("tomcat-jdbc.jar");
        fs::write(&jar, "jar").unwrap();
        let destination = dir.path().join("app/WEB-INF/lib");

        let linked = FsLibraryLinker::new()
            .link_to(&[jar.clone()], &destination)
            .unwrap();

        assert_eq!(linked, vec![destination.join("tomcat-jdbc.jar")]);
        assert_eq!(fs::read_to_string(&linked[0]).unwrap(), "jar");
    }

    #[test]
    fn test_relinking_replaces_existing_entry() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("driver.jar");
        fs::write(&jar, "new").unwrap();
        let destination = dir.path().join("lib");
        fs::create_dir_all(&destination).unwrap();
        fs::write(destination.join("driver.jar"), "old").unwrap();

        FsLibraryLinker::new().link_to(&[jar], &destination).unwrap();
        assert_eq!(
            fs::read_to_string(destination.join("driver.jar")).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_missing_library_is_error() {
        let dir = TempDir::new().unwrap();
        let err = FsLibraryLinker::new()
            .link_to(&[dir.path().join("missing.jar")], dir.path())
            .unwrap_err();
        assert!(matches!(err, DeployError::LibraryLink { .. }));
    }

    #[test]
    fn test_no_libraries_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("WEB-INF/lib");
        assert!(FsLibraryLinker::new().link_to(&[], &destination).unwrap().is_empty());
        assert!(!destination.exists());
    }
}
