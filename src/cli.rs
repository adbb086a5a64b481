use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::diff::{ApplyOptions, CreateOptions};

/// 逐字节对比文件, 生成可在之后应用的差异文件
#[derive(Parser)]
#[command(name = "diff-cli")]
#[command(about = "二进制文件差异生成与应用工具", long_about = None)]
pub struct Cli {
    /// TOML 配置文件, 提供 create / apply 的默认选项
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 对比两个文件, 记录第二个文件相对第一个文件的差异
    Create {
        /// 第一个文件 (例如 /path/to/unsigned/file)
        file1: PathBuf,
        /// 第二个文件 (例如 /path/to/signed/file)
        file2: PathBuf,
        /// 差异文件输出目录
        diff_dir: PathBuf,
        /// 差异文件扩展名 (默认 .diff)
        #[arg(long = "diff-ext-name")]
        diff_ext_name: Option<String>,
        /// 使用固定时间 1971-08-21T00:01:00Z 代替当前时间
        #[arg(long)]
        static_time: bool,
        #[arg(short, long)]
        quiet: bool,
    },
    /// 将差异文件应用到对应文件 (原地修改)
    Apply {
        /// 之前生成的差异文件
        diff_file: PathBuf,
        /// 要应用差异的文件
        file: PathBuf,
        /// 只生成 .bak 文件, 不替换原文件
        #[arg(long)]
        dry_run: bool,
        #[arg(short, long)]
        quiet: bool,
    },
    /// 显示差异文件头部
    PrintHeader {
        diff_file: PathBuf,
    },
}

/// 配置文件内容
///
/// ```toml
/// [create]
/// diff_file_extension_name = ".signature"
/// use_static_time = true
///
/// [apply]
/// dry_run = false
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub create: CreateOptions,
    pub apply: ApplyOptions,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("无法读取配置文件: {:?}", path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("无法解析配置文件: {:?}", path))?;
        config.create.validate()?;
        Ok(config)
    }
}
