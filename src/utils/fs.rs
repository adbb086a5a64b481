use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{DiffError, Result};

/// 应用差异时备份文件的后缀
pub const BACKUP_SUFFIX: &str = ".bak";

/// 文件名 (不含目录)
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// 检查路径存在且为普通文件
pub fn check_exists_and_is_file(path: &Path) -> Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DiffError::validation(format!(
                "file {} does not exist",
                path.display()
            )));
        }
        Err(source) => {
            return Err(DiffError::Io {
                context: format!("failed to read metadata of {}", path.display()),
                source,
            });
        }
    };

    if !metadata.is_file() {
        return Err(DiffError::validation(format!(
            "{} exists, but is not a regular file",
            path.display()
        )));
    }
    Ok(())
}

/// 检查路径为目录或不存在, 返回是否需要创建
pub fn check_is_dir_or_absent(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(false),
        Ok(_) => Err(DiffError::validation(format!(
            "{} is not a directory",
            path.display()
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(source) => Err(DiffError::Io {
            context: format!("failed to read metadata of {}", path.display()),
            source,
        }),
    }
}

/// 路径中最上层的不存在的目录, 即 `create_dir_all` 将会创建的第一层
pub fn first_missing_ancestor(path: &Path) -> Option<PathBuf> {
    let mut missing = None;
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() || fs::symlink_metadata(ancestor).is_ok() {
            break;
        }
        missing = Some(ancestor.to_path_buf());
    }
    missing
}

/// 备份文件路径: 规范路径 + `.bak`
pub fn backup_path(canonical: &Path) -> PathBuf {
    let mut name = OsString::from(canonical.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// 删除文件, 文件不存在时不报错
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
