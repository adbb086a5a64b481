use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::io::{BufRead, Write};
use std::str;

use super::framing::{
    self, CREATED_AT_LABEL, CREATED_FOR_FILE_LABEL, CREATED_FOR_HASH_LABEL,
    CREATED_FROM_HASH_LABEL, SCHEMA_LABEL,
};
use super::schema::Schema;
use crate::error::{DiffError, HeaderField, IoResultExt, ParseError, Result};

/// 差异文件头部
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub schema: Schema,
    created_at: DateTime<Utc>,
    /// 原文件名, 仅供参考
    pub created_for_file: String,
    /// 原文件的 SHA256
    pub created_for_hash: String,
    /// 目标文件的 SHA256, 应用差异后的结果必须与之一致
    pub created_from_hash: String,
}

impl Header {
    pub fn new(
        schema: Schema,
        created_at: DateTime<Utc>,
        created_for_file: impl Into<String>,
        created_for_hash: impl Into<String>,
        created_from_hash: impl Into<String>,
    ) -> std::result::Result<Self, ParseError> {
        let created_for_file = created_for_file.into();
        let created_for_hash = created_for_hash.into();
        let created_from_hash = created_from_hash.into();

        if created_for_file.contains(['\n', '\r']) {
            return Err(ParseError::InvalidFileName(created_for_file));
        }

        if !framing::is_sha256_hex(&created_for_hash) {
            return Err(ParseError::InvalidHash {
                field: HeaderField::CreatedForHash,
                value: created_for_hash,
            });
        }
        if !framing::is_sha256_hex(&created_from_hash) {
            return Err(ParseError::InvalidHash {
                field: HeaderField::CreatedFromHash,
                value: created_from_hash,
            });
        }

        Ok(Self {
            schema,
            created_at,
            created_for_file,
            created_for_hash,
            created_from_hash,
        })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn created_at_string(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        framing::write_field(w, SCHEMA_LABEL, self.schema.name())?;
        framing::write_field(w, CREATED_AT_LABEL, &self.created_at_string())?;
        framing::write_field(w, CREATED_FOR_FILE_LABEL, &self.created_for_file)?;
        framing::write_field(w, CREATED_FOR_HASH_LABEL, &self.created_for_hash)?;
        framing::write_field(w, CREATED_FROM_HASH_LABEL, &self.created_from_hash)
    }

    /// 从差异文件开头读取头部, 不会读取其余内容
    pub(crate) fn read_from<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut buf = Vec::new();

        let schema = read_field(reader, &mut buf, SCHEMA_LABEL, HeaderField::Schema)?;
        let schema: Schema = schema.parse()?;

        let created_at = read_field(reader, &mut buf, CREATED_AT_LABEL, HeaderField::CreatedAt)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|source| ParseError::InvalidTimestamp {
                value: created_at.clone(),
                source,
            })?
            .with_timezone(&Utc);

        let created_for_file = read_field(
            reader,
            &mut buf,
            CREATED_FOR_FILE_LABEL,
            HeaderField::CreatedForFile,
        )?;
        let created_for_hash = read_field(
            reader,
            &mut buf,
            CREATED_FOR_HASH_LABEL,
            HeaderField::CreatedForHash,
        )?;
        let created_from_hash = read_field(
            reader,
            &mut buf,
            CREATED_FROM_HASH_LABEL,
            HeaderField::CreatedFromHash,
        )?;

        Ok(Header::new(
            schema,
            created_at,
            created_for_file,
            created_for_hash,
            created_from_hash,
        )?)
    }
}

/// 读取一个字段: 一行空行, 然后是 标签 + 值
fn read_field<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    label: &str,
    field: HeaderField,
) -> Result<String> {
    let separator = framing::read_line(reader, buf)
        .with_context(|| format!("failed to read diff {field}"))?;
    if !matches!(separator, Some(line) if line.is_empty()) {
        return Err(DiffError::Parse(ParseError::MissingField(field)));
    }

    let line = framing::read_line(reader, buf)
        .with_context(|| format!("failed to read diff {field}"))?
        .ok_or(ParseError::MissingField(field))?;

    let value = line
        .strip_prefix(label.as_bytes())
        .and_then(|value| str::from_utf8(value).ok())
        .ok_or(ParseError::MissingField(field))?;

    Ok(value.to_string())
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DiffHeader [")?;
        writeln!(f, "    schema: {}", self.schema)?;
        writeln!(f, "    createdAt: {}", self.created_at_string())?;
        writeln!(f, "    createdForFile: {}", self.created_for_file)?;
        writeln!(f, "    createdForHash: {}", self.created_for_hash)?;
        writeln!(f, "    createdFromHash: {}", self.created_from_hash)?;
        write!(f, "]")
    }
}
