use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::feed::EncoderFeed;
use super::framing::{self, EOF_HASH_LABEL, LINE_BREAK};
use super::header::Header;
use super::options::CreateOptions;
use super::schema::Schema;
use crate::error::{DiffError, IoResultExt, Result};
use crate::utils::{
    BUFFER_SIZE, HashingWriter, base_name, check_exists_and_is_file, check_is_dir_or_absent,
    first_missing_ancestor, hash_length_of, read_window,
};

/// 对比两个文件, 将差异写入 `diff_dir/<file1 文件名><扩展名>`
pub fn create_diff(
    file1: &Path,
    file2: &Path,
    diff_dir: &Path,
    options: &CreateOptions,
) -> Result<PathBuf> {
    if file1 == file2 {
        return Err(DiffError::validation("files cannot be the same"));
    }
    check_exists_and_is_file(file1)?;
    check_exists_and_is_file(file2)?;

    let canonical1 = fs::canonicalize(file1)
        .with_context(|| format!("failed to canonicalize {}", file1.display()))?;
    let canonical2 = fs::canonicalize(file2)
        .with_context(|| format!("failed to canonicalize {}", file2.display()))?;
    if canonical1 == canonical2 {
        return Err(DiffError::validation("files cannot be the same"));
    }

    // 文件名写在头部的一行中
    let name = base_name(file1);
    if name.contains(['\n', '\r']) {
        return Err(DiffError::validation(format!(
            "file name {name:?} cannot contain line breaks"
        )));
    }

    // 失败时只删除本次调用创建的目录
    let created_root = if check_is_dir_or_absent(diff_dir)? {
        first_missing_ancestor(diff_dir)
    } else {
        None
    };
    options.validate()?;

    let (f1_hash, f1_len) = hash_length_of(file1)
        .with_context(|| format!("failed to hash {}", file1.display()))?;
    let (f2_hash, f2_len) = hash_length_of(file2)
        .with_context(|| format!("failed to hash {}", file2.display()))?;
    debug!(file = %file1.display(), hash = %f1_hash, len = f1_len, "hashed file1");
    debug!(file = %file2.display(), hash = %f2_hash, len = f2_len, "hashed file2");

    if f1_hash == f2_hash {
        return Err(DiffError::NoDifference {
            file1: file1.to_path_buf(),
            file2: file2.to_path_buf(),
        });
    }

    let header = Header::new(options.schema, options.time(), &name, f1_hash, f2_hash)?;

    fs::create_dir_all(diff_dir)
        .with_context(|| format!("failed to create directory {}", diff_dir.display()))?;
    let canonical_dir = fs::canonicalize(diff_dir)
        .with_context(|| format!("failed to canonicalize {}", diff_dir.display()))?;
    let diff_file = canonical_dir.join(format!("{}{}", name, options.diff_file_extension_name));

    let sink = match OpenOptions::new().write(true).create_new(true).open(&diff_file) {
        Ok(file) => file,
        Err(e) => {
            cleanup(created_root.as_deref(), None);
            if e.kind() == io::ErrorKind::AlreadyExists {
                return Err(DiffError::validation(format!(
                    "diff file {} already exists",
                    diff_file.display()
                )));
            }
            return Err(DiffError::Io {
                context: format!("failed to create {}", diff_file.display()),
                source: e,
            });
        }
    };

    write_or_clean_up(
        sink,
        &header,
        (file1, f1_len),
        (file2, f2_len),
        &diff_file,
        created_root.as_deref(),
    )?;

    info!(diff = %diff_file.display(), "diff created for {}", name);
    Ok(diff_file)
}

/// 写入差异文件, 失败时删除残留的文件或目录并包装错误
fn write_or_clean_up(
    sink: File,
    header: &Header,
    (file1, f1_len): (&Path, u64),
    (file2, f2_len): (&Path, u64),
    diff_file: &Path,
    created_root: Option<&Path>,
) -> Result<()> {
    write_diff(sink, header, file1, file2, (f1_len, f2_len)).map_err(|e| {
        cleanup(created_root, Some(diff_file));
        DiffError::Create {
            file: header.created_for_file.clone(),
            source: Box::new(e),
        }
    })
}

fn write_diff(
    sink: File,
    header: &Header,
    file1: &Path,
    file2: &Path,
    (f1_len, f2_len): (u64, u64),
) -> Result<()> {
    let context = || format!("failed to write diff for {}", header.created_for_file);
    let mut diff = BufWriter::new(HashingWriter::new(sink));

    header.write_to(&mut diff).with_context(context)?;

    let mut reader1 = BufReader::new(
        File::open(file1).with_context(|| format!("failed to open {}", file1.display()))?,
    );
    let mut reader2 = BufReader::new(
        File::open(file2).with_context(|| format!("failed to open {}", file2.display()))?,
    );

    let encoded = match header.schema {
        Schema::V1 => encode_v1(&mut reader1, f1_len, &mut reader2, f2_len, &mut diff),
    };
    encoded.with_context(context)?;

    // 最后一行记录此前写入的所有内容的哈希, 应用时用来检查差异文件是否被修改
    diff.write_all(LINE_BREAK).with_context(context)?;
    diff.write_all(LINE_BREAK).with_context(context)?;
    diff.flush().with_context(context)?;
    let hash = diff.get_ref().hash_hex();

    diff.write_all(EOF_HASH_LABEL.as_bytes()).with_context(context)?;
    diff.write_all(hash.as_bytes()).with_context(context)?;
    diff.write_all(LINE_BREAK).with_context(context)?;

    let file = diff
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(context)?
        .into_inner();
    file.sync_all().with_context(context)?;
    Ok(())
}

/// 逐窗口比较两个文件, 将 file2 中不同的字节按段写出
///
/// 窗口长度不同时, 较长窗口 (file2) 多出的字节并入当前段。
fn encode_v1<R1: Read, R2: Read, W: Write>(
    file1: &mut R1,
    f1_len: u64,
    file2: &mut R2,
    f2_len: u64,
    diff: &mut W,
) -> io::Result<()> {
    let mut buf1 = [0u8; BUFFER_SIZE];
    let mut buf2 = [0u8; BUFFER_SIZE];
    let mut feed = EncoderFeed::new();
    let mut index = 0u64;

    loop {
        let read1 = read_window(file1, &mut buf1)?;
        let read2 = read_window(file2, &mut buf2)?;
        if read1 == 0 && read2 == 0 {
            break;
        }

        let common = read1.min(read2);
        for (&b1, &b2) in buf1[..common].iter().zip(&buf2[..common]) {
            if b1 == b2 {
                if feed.is_open() {
                    feed.finalize(diff)?;
                    diff.write_all(LINE_BREAK)?;
                }
            } else {
                if !feed.is_open() {
                    framing::write_index(diff, index)?;
                }
                feed.consume(b2, diff)?;
            }
            index += 1;
        }

        if read2 > common {
            if !feed.is_open() {
                framing::write_index(diff, index)?;
            }
            for &b in &buf2[common..read2] {
                feed.consume(b, diff)?;
            }
        }
    }

    if feed.is_open() {
        feed.finalize(diff)?;
    }

    // file2 不比 file1 长时, 写一个空的索引, 应用时据此复制 file1 剩余的相同部分
    if f2_len <= f1_len {
        framing::write_index(diff, f2_len)?;
    }
    Ok(())
}

fn cleanup(created_root: Option<&Path>, diff_file: Option<&Path>) {
    let result = if let Some(root) = created_root {
        fs::remove_dir_all(root)
    } else if let Some(diff_file) = diff_file {
        crate::utils::remove_file_if_exists(diff_file)
    } else {
        Ok(())
    };

    if let Err(e) = result {
        warn!(error = %e, "failed to clean up after diff creation");
    }
}
