use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::schema::Schema;
use crate::error::{DiffError, Result};

/// 生成差异文件的选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOptions {
    pub diff_file_extension_name: String,
    /// 使用固定时间 [`CreateOptions::STATIC_TIME`] 而非当前时间, 便于复现
    pub use_static_time: bool,
    pub schema: Schema,
}

impl CreateOptions {
    pub const DEFAULT_EXT_NAME: &'static str = ".diff";
    pub const STATIC_TIME: &'static str = "1971-08-21T00:01:00Z";

    const STATIC_TIME_SECS: i64 = 51_580_860;

    pub fn new() -> Self {
        Self {
            diff_file_extension_name: Self::DEFAULT_EXT_NAME.to_string(),
            use_static_time: false,
            schema: Schema::latest(),
        }
    }

    pub fn with_extension_name(mut self, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_extension_name(&value)?;
        self.diff_file_extension_name = value;
        Ok(self)
    }

    pub fn with_static_time(mut self, value: bool) -> Self {
        self.use_static_time = value;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_extension_name(&self.diff_file_extension_name)
    }

    /// 写入头部的时间
    pub fn time(&self) -> DateTime<Utc> {
        if self.use_static_time {
            Self::static_time()
        } else {
            Utc::now()
        }
    }

    pub fn static_time() -> DateTime<Utc> {
        DateTime::<Utc>::default() + TimeDelta::seconds(Self::STATIC_TIME_SECS)
    }
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_extension_name(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DiffError::validation(
            "diff file extension name cannot be blank",
        ));
    }
    if value.contains(['\n', '\r']) {
        return Err(DiffError::validation(
            "diff file extension name cannot contain line breaks",
        ));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(DiffError::validation(
            "diff file extension name cannot contain white space",
        ));
    }
    if !value.starts_with('.') {
        return Err(DiffError::validation(
            "diff file extension name must start with a '.'",
        ));
    }
    if value.chars().count() < 2 {
        return Err(DiffError::validation(
            "diff file extension name length must be greater than 1",
        ));
    }
    Ok(())
}

/// 应用差异文件的选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// 只生成 `.bak` 文件, 不替换原文件
    pub dry_run: bool,
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dry_run(mut self, value: bool) -> Self {
        self.dry_run = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_time_matches_constant() {
        let parsed: DateTime<Utc> = CreateOptions::STATIC_TIME.parse().unwrap();
        assert_eq!(CreateOptions::static_time(), parsed);
    }

    #[test]
    fn extension_name_validation() {
        for bad in ["", "   ", "diff", ".", ".a b", ".a\nb", ".a\tb"] {
            assert!(
                CreateOptions::new().with_extension_name(bad).is_err(),
                "{bad:?} should be rejected"
            );
        }
        let options = CreateOptions::new().with_extension_name(".signature").unwrap();
        assert_eq!(options.diff_file_extension_name, ".signature");
    }
}
