use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::feed::DecoderFeed;
use super::framing::{self, INDEX_LABEL, LINE_BREAK};
use super::header::Header;
use super::options::ApplyOptions;
use super::schema::Schema;
use crate::error::{DiffError, IntegrityError, IoResultExt, ParseError, Result};
use crate::utils::{
    HashingWriter, backup_path, check_exists_and_is_file, hash_length_of, remove_file_if_exists,
};

/// 应用差异文件
///
/// 先在 `<文件>.bak` 中重建目标文件, 校验通过后再原子地替换原文件。
/// 返回重建结果所在的路径 (dry run 时为备份文件)。
pub fn apply_diff(diff_file: &Path, apply_to: &Path, options: &ApplyOptions) -> Result<PathBuf> {
    if diff_file == apply_to {
        return Err(DiffError::validation("cannot apply a diff to itself"));
    }
    check_exists_and_is_file(apply_to)?;
    check_exists_and_is_file(diff_file)?;

    let canonical = fs::canonicalize(apply_to)
        .with_context(|| format!("failed to canonicalize {}", apply_to.display()))?;
    let canonical_diff = fs::canonicalize(diff_file)
        .with_context(|| format!("failed to canonicalize {}", diff_file.display()))?;
    if canonical == canonical_diff {
        return Err(DiffError::validation("cannot apply a diff to itself"));
    }

    verify_diff_hash(diff_file)?;

    let mut diff = BufReader::new(
        File::open(diff_file)
            .with_context(|| format!("failed to open {}", diff_file.display()))?,
    );
    let header = Header::read_from(&mut diff)?;

    let (hash, original_len) = hash_length_of(apply_to)
        .with_context(|| format!("failed to hash {}", apply_to.display()))?;
    if hash != header.created_for_hash {
        return Err(IntegrityError::NotCreatedFor {
            file: apply_to.to_path_buf(),
            actual: hash,
            expected: header.created_for_hash,
        }
        .into());
    }

    let backup = backup_path(&canonical);
    remove_file_if_exists(&backup)
        .with_context(|| format!("failed to remove stale backup {}", backup.display()))?;

    let reconstructed = match reconstruct(&header, &mut diff, &canonical, original_len, &backup) {
        Ok(hash) => hash,
        Err(e) => {
            discard_backup(&backup);
            return Err(e);
        }
    };

    if reconstructed != header.created_from_hash {
        discard_backup(&backup);
        return Err(IntegrityError::Reconstruction {
            file: apply_to.to_path_buf(),
            actual: reconstructed,
            expected: header.created_from_hash,
        }
        .into());
    }

    if options.dry_run {
        info!(backup = %backup.display(), "dry run, diff applied to backup");
        return Ok(backup);
    }

    if let Err(source) = fs::rename(&backup, &canonical) {
        discard_backup(&backup);
        return Err(DiffError::Io {
            context: format!(
                "failed to move {} to {}",
                backup.display(),
                canonical.display()
            ),
            source,
        });
    }

    info!(file = %canonical.display(), "diff applied");
    Ok(canonical)
}

/// 校验差异文件最后一行记录的哈希
fn verify_diff_hash(diff_file: &Path) -> Result<()> {
    let context = || format!("failed to read {}", diff_file.display());
    let mut reader = BufReader::new(File::open(diff_file).with_context(context)?);
    let mut hasher = Sha256::new();
    let mut recorded = String::new();
    let mut line = Vec::new();

    while let Some(bytes) = framing::read_line(&mut reader, &mut line).with_context(context)? {
        if let Some(hash) = framing::parse_eof_hash(bytes) {
            recorded = hash.to_string();
            break;
        }
        hasher.update(bytes);
        hasher.update(LINE_BREAK);
    }

    let actual = hex::encode(hasher.finalize());
    if actual != recorded {
        return Err(IntegrityError::DiffModified {
            diff_file: diff_file.to_path_buf(),
            actual,
            recorded,
        }
        .into());
    }

    debug!(diff = %diff_file.display(), hash = %actual, "diff file hash verified");
    Ok(())
}

/// 将重建结果写入备份文件, 返回其哈希
fn reconstruct<R: BufRead>(
    header: &Header,
    diff: &mut R,
    original: &Path,
    original_len: u64,
    backup: &Path,
) -> Result<String> {
    let context = || format!("failed to write {}", backup.display());

    let mut source = BufReader::new(
        File::open(original).with_context(|| format!("failed to open {}", original.display()))?,
    );
    let sink = File::create(backup).with_context(context)?;
    let mut out = BufWriter::new(HashingWriter::new(sink));

    match header.schema {
        Schema::V1 => decode_v1(diff, &mut source, original_len, &mut out)?,
    }

    let hashing = out
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(context)?;
    let hash = hashing.hash_hex();
    hashing.into_inner().sync_all().with_context(context)?;

    // 替换后保留原文件的权限 (例如可执行位)
    let permissions = fs::metadata(original)
        .with_context(|| format!("failed to read metadata of {}", original.display()))?
        .permissions();
    fs::set_permissions(backup, permissions).with_context(context)?;
    Ok(hash)
}

/// 按顺序处理索引与数据行
///
/// `written` 为已写入备份文件的字节数, `consumed` 为已读过的原文件字节数。
/// 每写出一个替换字节, 原文件也跳过一个字节, 直到原文件读完。
fn decode_v1<R: BufRead, O: Read, W: Write>(
    diff: &mut R,
    original: &mut O,
    original_len: u64,
    out: &mut W,
) -> Result<()> {
    let context = || "failed to apply diff".to_string();
    let mut feed = DecoderFeed::new();
    let mut written = 0u64;
    let mut consumed = 0u64;
    let mut line = Vec::new();

    while let Some(bytes) = framing::read_line(diff, &mut line).with_context(context)? {
        if framing::parse_eof_hash(bytes).is_some() {
            break;
        }

        if let Some(index) = bytes.strip_prefix(INDEX_LABEL.as_bytes()) {
            if feed.is_open() {
                feed.finalize()?;
            }

            let index = parse_index(index)?;
            if index < written {
                return Err(ParseError::IndexOutOfOrder { index, written }.into());
            }
            if index > written {
                let gap = index - written;
                let copied = io::copy(&mut original.by_ref().take(gap), out).with_context(context)?;
                if copied != gap {
                    return Err(ParseError::IndexOutOfRange {
                        index,
                        len: original_len,
                    }
                    .into());
                }
                written = index;
                consumed += gap;
            }
            continue;
        }

        for &ch in bytes {
            let decoded = feed.consume(ch)?;
            if decoded.is_empty() {
                continue;
            }
            out.write_all(decoded).with_context(context)?;

            let count = decoded.len() as u64;
            written += count;
            let skip = count.min(original_len.saturating_sub(consumed));
            if skip > 0 {
                io::copy(&mut original.by_ref().take(skip), &mut io::sink())
                    .with_context(context)?;
                consumed += skip;
            }
        }
    }

    if feed.is_open() {
        feed.finalize()?;
    }
    Ok(())
}

fn parse_index(value: &[u8]) -> Result<u64> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            ParseError::InvalidIndex(String::from_utf8_lossy(value).into_owned()).into()
        })
}

fn discard_backup(backup: &Path) {
    if let Err(e) = remove_file_if_exists(backup) {
        warn!(backup = %backup.display(), error = %e, "failed to remove backup");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str, original: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        decode_v1(
            &mut body.as_bytes(),
            &mut &original[..],
            original.len() as u64,
            &mut out,
        )?;
        Ok(out)
    }

    #[test]
    fn copies_gaps_and_replaces_runs() {
        let out = decode("\n i:4\nMg==\n\n i:10\n", b"FILE1\nDiff").unwrap();
        assert_eq!(out, b"FILE2\nDiff");
    }

    #[test]
    fn appends_past_end_of_original() {
        let out = decode("\n i:2\nY2Q=", b"ab").unwrap();
        assert_eq!(out, b"abcd");
    }

    #[test]
    fn truncates_when_no_trailing_index() {
        let out = decode("\n i:0\n", b"abc").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_decreasing_index() {
        let err = decode("\n i:4\nMg==\n\n i:2\n", b"FILE1\nDiff").unwrap_err();
        assert!(matches!(
            err,
            DiffError::Parse(ParseError::IndexOutOfOrder { index: 2, written: 5 })
        ));
    }

    #[test]
    fn rejects_index_past_original() {
        let err = decode("\n i:20\n", b"short").unwrap_err();
        assert!(matches!(
            err,
            DiffError::Parse(ParseError::IndexOutOfRange { index: 20, .. })
        ));
    }
}
