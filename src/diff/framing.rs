//! 差异文件的文本帧格式
//!
//! 每个字段行之前都有一个空行, 写入时为 `\n` + 标签 + 值 + `\n`。

use std::io::{self, BufRead, Read, Write};

pub(crate) const LINE_BREAK: &[u8] = b"\n";

pub(crate) const SCHEMA_LABEL: &str = " Diff Schema: ";
pub(crate) const CREATED_AT_LABEL: &str = " Created At: ";
pub(crate) const CREATED_FOR_FILE_LABEL: &str = " Created For File: ";
pub(crate) const CREATED_FOR_HASH_LABEL: &str = " Created For Hash: ";
pub(crate) const CREATED_FROM_HASH_LABEL: &str = " Created From Hash: ";

pub(crate) const INDEX_LABEL: &str = " i:";
pub(crate) const EOF_HASH_LABEL: &str = " END: ";

const SHA256_HEX_LEN: usize = 64;

/// 单行最大字节数 (不含换行符), 正常的差异文件每行远小于此值
pub(crate) const MAX_LINE_LEN: usize = 4096;

/// 写入一个带前置空行的字段
pub(crate) fn write_field<W: Write>(w: &mut W, label: &str, value: &str) -> io::Result<()> {
    w.write_all(LINE_BREAK)?;
    w.write_all(label.as_bytes())?;
    w.write_all(value.as_bytes())?;
    w.write_all(LINE_BREAK)
}

pub(crate) fn write_index<W: Write>(w: &mut W, index: u64) -> io::Result<()> {
    write_field(w, INDEX_LABEL, &index.to_string())
}

/// 读取一行 (不含换行符), 到达末尾时返回 `None`
///
/// 超过 [`MAX_LINE_LEN`] 的行返回 `InvalidData`, 不会读入内存。
pub(crate) fn read_line<'a, R: BufRead>(
    reader: &mut R,
    buf: &'a mut Vec<u8>,
) -> io::Result<Option<&'a [u8]>> {
    buf.clear();
    let limit = (MAX_LINE_LEN + 1) as u64;
    if reader.by_ref().take(limit).read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > MAX_LINE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("diff line longer than {MAX_LINE_LEN} bytes"),
        ));
    }
    Ok(Some(buf.as_slice()))
}

/// `END` 行中记录的哈希, 不是 `END` 行时返回 `None`
pub(crate) fn parse_eof_hash(line: &[u8]) -> Option<&str> {
    if line.len() != EOF_HASH_LABEL.len() + SHA256_HEX_LEN {
        return None;
    }
    let hash = line.strip_prefix(EOF_HASH_LABEL.as_bytes())?;
    std::str::from_utf8(hash).ok()
}

/// 是否为 64 位小写十六进制 SHA256
pub(crate) fn is_sha256_hex(value: &str) -> bool {
    value.len() == SHA256_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_line_strips_line_break() {
        let mut reader: &[u8] = b"\n i:12\nabc";
        let mut buf = Vec::new();

        assert_eq!(read_line(&mut reader, &mut buf).unwrap(), Some(&b""[..]));
        assert_eq!(read_line(&mut reader, &mut buf).unwrap(), Some(&b" i:12"[..]));
        assert_eq!(read_line(&mut reader, &mut buf).unwrap(), Some(&b"abc"[..]));
        assert_eq!(read_line(&mut reader, &mut buf).unwrap(), None);
    }

    #[test]
    fn read_line_rejects_oversized_line() {
        let mut exact = vec![b'a'; MAX_LINE_LEN];
        exact.push(b'\n');
        let mut reader: &[u8] = &exact;
        let mut buf = Vec::new();
        let line = read_line(&mut reader, &mut buf).unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN);

        let long = vec![b'a'; MAX_LINE_LEN * 4];
        let mut reader: &[u8] = &long;
        let err = read_line(&mut reader, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(buf.len() <= MAX_LINE_LEN + 1);
    }

    #[test]
    fn eof_hash_requires_exact_length() {
        let hash = "a".repeat(64);
        let line = format!("{EOF_HASH_LABEL}{hash}");
        assert_eq!(parse_eof_hash(line.as_bytes()), Some(hash.as_str()));
        assert_eq!(parse_eof_hash(format!("{line}x").as_bytes()), None);
        assert_eq!(parse_eof_hash(b" END: abc"), None);
    }

    #[test]
    fn sha256_hex_is_lowercase_only() {
        let hash = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(is_sha256_hex(hash));
        assert!(!is_sha256_hex(&hash.to_uppercase()));
        assert!(!is_sha256_hex(&hash[1..]));
    }
}
