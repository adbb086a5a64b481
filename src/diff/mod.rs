mod apply;
mod create;
mod feed;
mod framing;
mod header;
mod options;
mod schema;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{IoResultExt, Result};

pub use header::Header;
pub use options::{ApplyOptions, CreateOptions};
pub use schema::Schema;

/// 对比两个文件并在 `diff_dir` 中生成差异文件
///
/// 两个文件内容相同时返回 [`DiffError::NoDifference`](crate::DiffError::NoDifference)。
pub fn create(
    file1: &Path,
    file2: &Path,
    diff_dir: &Path,
    options: &CreateOptions,
) -> Result<PathBuf> {
    create::create_diff(file1, file2, diff_dir, options)
}

/// 将差异文件应用到其对应的文件上 (原地替换)
pub fn apply(diff_file: &Path, apply_to: &Path, options: &ApplyOptions) -> Result<PathBuf> {
    apply::apply_diff(diff_file, apply_to, options)
}

/// 只读取差异文件的头部
pub fn read_header(diff_file: &Path) -> Result<Header> {
    let file = File::open(diff_file)
        .with_context(|| format!("failed to open {}", diff_file.display()))?;
    Header::read_from(&mut BufReader::new(file))
}
