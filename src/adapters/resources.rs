use crate::domain::ports::ResourceCopier;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 把資源目錄的內容原樣複製到 sandbox，已存在的檔案會被覆蓋
#[derive(Debug, Clone, Default)]
pub struct DirectoryResourceCopier {
    source: Option<PathBuf>,
}

impl DirectoryResourceCopier {
    pub fn new(source: Option<PathBuf>) -> Self {
        Self { source }
    }
}

impl ResourceCopier for DirectoryResourceCopier {
    fn copy_resources(&self, sandbox: &Path) -> Result<()> {
        let Some(source) = self.source.as_deref().filter(|s| s.is_dir()) else {
            tracing::debug!("No resource overlay to copy");
            return Ok(());
        };

        let mut copied = 0usize;
        for entry in WalkDir::new(source).min_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            let target = sandbox.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
                copied += 1;
            }
        }

        tracing::debug!(
            "Copied {} resource files from {} into {}",
            copied,
            source.display(),
            sandbox.display()
        );
        Ok(())
    }
}
