//! # Diff Core
//!
//! 二进制文件差异生成与应用工具库
//!
//! ## 功能
//!
//! - 逐字节对比两个文件, 生成带校验的文本差异文件
//! - 将差异文件应用到原文件, 校验通过后原子替换
//! - 流式处理, 内存占用与文件大小无关
//!
//! ## 使用示例
//!
//! ```no_run
//! use diff_core::diff::{ApplyOptions, CreateOptions, apply, create, read_header};
//! use std::path::Path;
//!
//! // 生成差异文件
//! let diff_file = create(
//!     Path::new("unsigned/tor"),
//!     Path::new("signed/tor"),
//!     Path::new("diffs"),
//!     &CreateOptions::default(),
//! ).unwrap();
//!
//! println!("{}", read_header(&diff_file).unwrap());
//!
//! // 应用差异文件
//! apply(&diff_file, Path::new("unsigned/tor"), &ApplyOptions::default()).unwrap();
//! ```

pub mod cli;
pub mod diff;
pub mod error;
pub mod utils;

// 重新导出常用类型
pub use diff::{ApplyOptions, CreateOptions, Header, Schema};
pub use diff::{apply, create, read_header};
pub use error::{DiffError, HeaderField, IntegrityError, ParseError, Result};
