use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// 差异文件格式版本
///
/// 新增格式时添加一个枚举值, 并在 `create` / `apply` 中各加一个分支。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Schema {
    #[serde(rename = "v1")]
    V1,
}

impl Schema {
    pub const ALL: &'static [Schema] = &[Schema::V1];

    pub const fn latest() -> Self {
        Schema::V1
    }

    pub const fn code(&self) -> u32 {
        match self {
            Schema::V1 => 1,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Schema::V1 => "v1",
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::latest()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Schema {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Schema::ALL
            .iter()
            .copied()
            .find(|schema| schema.name() == s)
            .ok_or_else(|| ParseError::UnknownSchema(s.to_string()))
    }
}
