use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffError>;

/// 差异编解码错误
#[derive(Debug, Error)]
pub enum DiffError {
    /// 两个文件内容完全相同, 无需生成差异文件
    #[error("no differences found between [{}] and [{}]", file1.display(), file2.display())]
    NoDifference { file1: PathBuf, file2: PathBuf },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// 写入差异文件失败, 残留文件已被清理
    #[error("failed to create diff for {file}")]
    Create {
        file: String,
        #[source]
        source: Box<DiffError>,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl DiffError {
    pub fn is_no_difference(&self) -> bool {
        matches!(self, DiffError::NoDifference { .. })
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DiffError::Validation(message.into())
    }
}

/// 应用差异时三个校验点之一的哈希不匹配
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error(
        "validation check failed, diff file {} content hash [{actual}] did not match recorded hash [{recorded}], was the diff file modified?",
        diff_file.display()
    )]
    DiffModified {
        diff_file: PathBuf,
        actual: String,
        recorded: String,
    },

    #[error(
        "cannot apply the diff, {} has sha256 [{actual}] but the diff was created for sha256 [{expected}]",
        file.display()
    )]
    NotCreatedFor {
        file: PathBuf,
        actual: String,
        expected: String,
    },

    #[error(
        "failed to apply diff to {}, reconstructed sha256 [{actual}] did not match expected sha256 [{expected}]",
        file.display()
    )]
    Reconstruction {
        file: PathBuf,
        actual: String,
        expected: String,
    },
}

/// 头部字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Schema,
    CreatedAt,
    CreatedForFile,
    CreatedForHash,
    CreatedFromHash,
}

impl std::fmt::Display for HeaderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HeaderField::Schema => "schema",
            HeaderField::CreatedAt => "createdAt",
            HeaderField::CreatedForFile => "createdForFile",
            HeaderField::CreatedForHash => "createdForHash",
            HeaderField::CreatedFromHash => "createdFromHash",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read diff {0}")]
    MissingField(HeaderField),

    #[error("failed to read diff createdAt [{value}]")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("unknown diff schema [{0}]")]
    UnknownSchema(String),

    #[error("createdForFile {0:?} cannot contain line breaks")]
    InvalidFileName(String),

    #[error("{field} invalid sha256 [{value}]")]
    InvalidHash { field: HeaderField, value: String },

    #[error("invalid diff index line [{0}]")]
    InvalidIndex(String),

    #[error("diff index {index} is behind the reconstructed length {written}")]
    IndexOutOfOrder { index: u64, written: u64 },

    #[error("diff index {index} is past the end of the original file ({len} bytes)")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("invalid base64 payload in diff: {0}")]
    InvalidPayload(String),
}

pub(crate) trait IoResultExt<T> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|source| DiffError::Io {
            context: f().into(),
            source,
        })
    }
}
