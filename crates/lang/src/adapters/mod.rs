mod python;

pub use python::PythonParser;

use crate::types::{ClassDecl, Result};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// 源码前端 trait - 每种语言一个实现
///
/// `parse_*` 可能失败；`get_*` 吞掉单文件失败，记录 warning 后返回空结果，
/// 调用方不会因为一个坏文件而中断。
pub trait SourceParser: Send + Sync {
    /// 源文件扩展名 (不含 `.`)
    fn source_extension(&self) -> &str;

    /// 每个目录的包标记文件名
    fn package_marker(&self) -> &str;

    /// 把点分导入目标解析为本地路径 (模块文件、包标记或包目录)
    fn resolve_module(&self, target: &str) -> Option<PathBuf>;

    /// 解析导入目标，去重并排序
    fn parse_imports(&self, path: &Path) -> Result<BTreeSet<String>>;

    /// 解析文件中声明的所有类型，嵌套声明挂在 `nested` 下
    fn parse_classes(&self, path: &Path) -> Result<Vec<ClassDecl>>;

    /// 抽象判定策略
    fn is_abstract_class(&self, decl: &ClassDecl) -> bool;

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(self.source_extension())
    }

    fn get_imports(&self, path: &Path) -> BTreeSet<String> {
        match self.parse_imports(path) {
            Ok(imports) => imports,
            Err(e) => {
                tracing::warn!("Skipping imports of {}: {}", path.display(), e);
                BTreeSet::new()
            }
        }
    }

    fn get_classes(&self, path: &Path) -> Vec<ClassDecl> {
        match self.parse_classes(path) {
            Ok(classes) => classes,
            Err(e) => {
                tracing::warn!("Skipping classes of {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }
}

/// 去掉路径中的 `.` 段，`./pkg/a.py` 与 `pkg/a.py` 视为同一路径
pub fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
