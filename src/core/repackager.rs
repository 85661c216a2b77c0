use crate::utils::error::{DeployError, Result};
use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::{DirEntry, WalkDir};
use zip::write::{FileOptions, ZipWriter};

/// 將展開的應用目錄重新打包成 war。
///
/// 以 `.` 開頭的檔案與目錄 (含其底下全部內容) 不會放進壓縮檔。
/// 先寫到同目錄的暫存檔，成功後才 rename 到目的地，失敗時不會留下半成品。
/// 回傳寫入的檔案數。
pub fn repackage(source_dir: &Path, destination: &Path) -> Result<usize> {
    if !source_dir.is_dir() {
        return Err(packaging(
            destination,
            format!("{} is not a directory", source_dir.display()),
        ));
    }

    let parent = destination
        .parent()
        .ok_or_else(|| packaging(destination, "destination has no parent directory"))?;
    fs::create_dir_all(parent).map_err(|e| packaging(destination, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| packaging(destination, e))?;
    let excluded = [temp.path().to_path_buf(), destination.to_path_buf()];

    let files = write_archive(source_dir, temp.as_file_mut(), &excluded)
        .map_err(|e| packaging(destination, e))?;
    temp.as_file().sync_all().map_err(|e| packaging(destination, e))?;

    temp.persist(destination)
        .map_err(|e| packaging(destination, e.error))?;

    tracing::debug!(
        "Packaged {} files from {} into {}",
        files,
        source_dir.display(),
        destination.display()
    );
    Ok(files)
}

/// 以相對於 `source_dir` 的路徑寫入 zip；`excluded` 內的路徑會略過
pub fn write_archive<W: Write + Seek>(
    source_dir: &Path,
    writer: W,
    excluded: &[std::path::PathBuf],
) -> Result<usize> {
    let mut zip = ZipWriter::new(writer);
    let mut files = 0;

    let walker = WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.depth() == 0 || excluded.iter().any(|p| p == entry.path()) {
            continue;
        }

        let name = entry_name(source_dir, entry.path())?;
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            // 不跟隨連結，避免讀到應用目錄以外的檔案
            tracing::warn!("Skipping symbolic link {} while packaging", entry.path().display());
        } else if file_type.is_dir() {
            zip.add_directory::<_, ()>(name, FileOptions::default())?;
        } else {
            zip.start_file::<_, ()>(name, FileOptions::default())?;
            let mut file = File::open(entry.path())?;
            std::io::copy(&mut file, &mut zip)?;
            files += 1;
        }
    }

    zip.finish()?;
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn entry_name(source_dir: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(source_dir)
        .map_err(|e| DeployError::Packaging {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

fn packaging(destination: &Path, reason: impl std::fmt::Display) -> DeployError {
    DeployError::Packaging {
        path: destination.to_path_buf(),
        reason: reason.to_string(),
    }
}
