//! lang - 源码前端
//!
//! 从单个源文件提取导入目标和类型声明

mod adapters;
mod types;

pub use adapters::{normalize_path, PythonParser, SourceParser};
pub use types::{ClassDecl, ParseError, Result};
