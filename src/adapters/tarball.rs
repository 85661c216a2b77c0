use crate::domain::ports::RuntimeExtractor;
use crate::utils::error::{DeployError, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

/// 展開 `.tar.gz`，去掉第一層目錄 (等同 `tar xzf --strip 1`)
#[derive(Debug, Clone, Default)]
pub struct TarballExtractor;

impl TarballExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl RuntimeExtractor for TarballExtractor {
    fn extract(&self, archive: &Path, sandbox: &Path) -> Result<()> {
        let fail = |reason: String| DeployError::Extraction {
            path: archive.to_path_buf(),
            reason,
        };

        let file = File::open(archive).map_err(|e| fail(e.to_string()))?;
        let mut tarball = tar::Archive::new(GzDecoder::new(file));
        fs::create_dir_all(sandbox)?;
        let root = fs::canonicalize(sandbox)?;

        let mut unpacked = 0usize;
        for entry in tarball.entries().map_err(|e| fail(e.to_string()))? {
            let mut entry = entry.map_err(|e| fail(e.to_string()))?;
            let path = entry.path().map_err(|e| fail(e.to_string()))?.into_owned();

            let Some(stripped) = strip_top_level(&path) else {
                continue;
            };
            if !is_plain_relative(&stripped) {
                return Err(fail(format!("entry {} escapes the sandbox", path.display())));
            }

            let target = sandbox.join(&stripped);
            let parent = target.parent().unwrap_or(sandbox);
            if !resolves_inside(&root, parent)? {
                return Err(fail(format!(
                    "entry {} resolves outside the sandbox",
                    path.display()
                )));
            }
            fs::create_dir_all(parent)?;

            let kind = entry.header().entry_type();
            if kind.is_symlink() || kind.is_hard_link() {
                let link = entry
                    .link_name()
                    .map_err(|e| fail(e.to_string()))?
                    .ok_or_else(|| fail(format!("link {} has no target", path.display())))?
                    .into_owned();

                if kind.is_hard_link() {
                    // 硬連結的目標同樣帶著最上層目錄，要相對 sandbox 解析
                    let source = strip_top_level(&link)
                        .filter(|s| is_plain_relative(s))
                        .map(|s| sandbox.join(s))
                        .ok_or_else(|| {
                            fail(format!(
                                "hard link {} -> {} escapes the sandbox",
                                path.display(),
                                link.display()
                            ))
                        })?;
                    if !resolves_inside(&root, &source)? {
                        return Err(fail(format!(
                            "hard link {} -> {} resolves outside the sandbox",
                            path.display(),
                            link.display()
                        )));
                    }
                    if fs::symlink_metadata(&target).is_ok() {
                        fs::remove_file(&target)?;
                    }
                    fs::hard_link(&source, &target)
                        .map_err(|e| fail(format!("{}: {}", stripped.display(), e)))?;
                    unpacked += 1;
                    continue;
                }

                if !link_stays_inside(&stripped, &link) {
                    return Err(fail(format!(
                        "symlink {} -> {} points outside the sandbox",
                        path.display(),
                        link.display()
                    )));
                }
            }

            entry
                .unpack(&target)
                .map_err(|e| fail(format!("{}: {}", stripped.display(), e)))?;
            unpacked += 1;
        }

        tracing::debug!("Unpacked {} entries into {}", unpacked, sandbox.display());
        Ok(())
    }
}

/// 去掉第一層目錄；只剩最上層目錄本身時回傳 None
fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let stripped: PathBuf = path.components().skip(1).collect();
    (!stripped.as_os_str().is_empty()).then_some(stripped)
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// 符號連結的目標必須是相對路徑，且從連結所在目錄出發不會爬出 sandbox
fn link_stays_inside(entry: &Path, link: &Path) -> bool {
    let mut depth = entry.components().count() as isize - 1;
    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// 從 `path` 往上找到第一個存在的目錄，確認它的實際位置 (跟隨連結後) 仍在 `root` 底下
fn resolves_inside(root: &Path, path: &Path) -> Result<bool> {
    let mut current = path;
    loop {
        if current.exists() {
            return Ok(fs::canonicalize(current)?.starts_with(root));
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn build_tarball(path: &Path, entries: &[(&str, &str)]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_strips_top_level_directory() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tomcat.tar.gz");
        build_tarball(
            &archive,
            &[
                ("apache-tomcat-7.0.50/conf/server.xml", "<Server/>"),
                ("apache-tomcat-7.0.50/lib/catalina.jar", "jar"),
            ],
        );
        let sandbox = dir.path().join("sandbox");

        TarballExtractor::new().extract(&archive, &sandbox).unwrap();

        assert_eq!(
            fs::read_to_string(sandbox.join("conf/server.xml")).unwrap(),
            "<Server/>"
        );
        assert!(sandbox.join("lib/catalina.jar").exists());
        assert!(!sandbox.join("apache-tomcat-7.0.50").exists());
    }

    fn build_tarball_with_links(path: &Path, links: &[(&str, &str)], files: &[(&str, &str)]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, target) in links {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            builder.append_link(&mut header, name, target).unwrap();
        }
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_rejects_absolute_symlink() {
        let dir = TempDir::new().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        let archive = dir.path().join("tomcat.tar.gz");
        build_tarball_with_links(
            &archive,
            &[("apache-tomcat/conf", outside.to_str().unwrap())],
            &[("apache-tomcat/conf/evil.txt", "evil")],
        );

        let err = TarballExtractor::new()
            .extract(&archive, &dir.path().join("sandbox"))
            .unwrap_err();

        assert!(matches!(err, DeployError::Extraction { .. }));
        assert!(!outside.join("evil.txt").exists());
    }

    #[test]
    fn test_extract_rejects_symlink_climbing_out() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tomcat.tar.gz");
        build_tarball_with_links(
            &archive,
            &[("apache-tomcat/conf/up", "../../..")],
            &[("apache-tomcat/conf/up/evil.txt", "evil")],
        );

        let err = TarballExtractor::new()
            .extract(&archive, &dir.path().join("sandbox"))
            .unwrap_err();

        assert!(matches!(err, DeployError::Extraction { .. }));
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_rejects_writes_through_chained_symlinks() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tomcat.tar.gz");
        // a -> . 讓 a/a/l 實際上位於 sandbox/l，l -> .. 就指到 sandbox 外面
        build_tarball_with_links(
            &archive,
            &[("apache-tomcat/a", "."), ("apache-tomcat/a/a/l", "..")],
            &[("apache-tomcat/a/a/l/evil.txt", "evil")],
        );

        let result = TarballExtractor::new().extract(&archive, &dir.path().join("sandbox"));

        assert!(matches!(result, Err(DeployError::Extraction { .. })));
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_keeps_symlinks_inside_sandbox() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tomcat.tar.gz");
        build_tarball_with_links(
            &archive,
            &[("apache-tomcat/lib/current.jar", "catalina.jar")],
            &[("apache-tomcat/lib/catalina.jar", "jar")],
        );
        let sandbox = dir.path().join("sandbox");

        TarballExtractor::new().extract(&archive, &sandbox).unwrap();

        assert_eq!(
            fs::read_link(sandbox.join("lib/current.jar")).unwrap(),
            PathBuf::from("catalina.jar")
        );
        assert_eq!(fs::read_to_string(sandbox.join("lib/current.jar")).unwrap(), "jar");
    }

    #[test]
    fn test_extract_missing_archive() {
        let dir = TempDir::new().unwrap();
        let err = TarballExtractor::new()
            .extract(&dir.path().join("missing.tar.gz"), dir.path())
            .unwrap_err();
        assert!(matches!(err, DeployError::Extraction { .. }));
    }
}
