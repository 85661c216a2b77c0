use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// 將下載好的 Tomcat 壓縮檔展開到 sandbox
pub trait RuntimeExtractor {
    fn extract(&self, archive: &Path, sandbox: &Path) -> Result<()>;
}

/// 將使用者提供的資源覆蓋到 sandbox
pub trait ResourceCopier {
    fn copy_resources(&self, sandbox: &Path) -> Result<()>;
}

/// 將額外的 jar 連結到應用的 WEB-INF/lib
pub trait LibraryLinker {
    fn link_to(&self, libraries: &[PathBuf], destination: &Path) -> Result<Vec<PathBuf>>;
}
