use super::{normalize_path, SourceParser};
use crate::types::{ClassDecl, ParseError, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

const SOURCE_EXTENSION: &str = "py";
const PACKAGE_MARKER: &str = "__init__.py";

/// 基类或 metaclass 命中其一即视为抽象类
const ABSTRACT_MARKERS: &[&str] = &["ABC", "ABCMeta"];

/// Python 源码前端 (tree-sitter)
///
/// 导入目标相对 `root` 解析，`root` 通常是运行目录。
pub struct PythonParser {
    root: PathBuf,
}

impl PythonParser {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize_path(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 日志用；空路径即当前目录
    pub fn root_display(&self) -> String {
        if self.root.as_os_str().is_empty() {
            ".".to_string()
        } else {
            self.root.display().to_string()
        }
    }

    fn create_parser() -> Result<Parser> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| ParseError::Language(e.to_string()))?;
        Ok(parser)
    }

    /// 解析源码；树中有 ERROR 节点同样算作失败
    fn parse_tree(content: &str, file_path: &Path) -> Result<Tree> {
        let mut parser = Self::create_parser()?;
        let tree = parser
            .parse(content.as_bytes(), None)
            .ok_or_else(|| ParseError::Syntax(file_path.display().to_string()))?;

        if tree.root_node().has_error() {
            return Err(ParseError::Syntax(file_path.display().to_string()));
        }
        Ok(tree)
    }

    /// 从源码提取导入目标，`file_path` 用于解析相对导入
    pub fn imports_from_source(&self, content: &str, file_path: &Path) -> Result<BTreeSet<String>> {
        let tree = Self::parse_tree(content, file_path)?;
        let mut imports = BTreeSet::new();
        self.collect_imports(tree.root_node(), content.as_bytes(), file_path, &mut imports);
        Ok(imports)
    }

    /// 从源码提取类型声明
    pub fn classes_from_source(content: &str, file_path: &Path) -> Result<Vec<ClassDecl>> {
        let tree = Self::parse_tree(content, file_path)?;
        let mut classes = Vec::new();
        Self::collect_classes(tree.root_node(), content.as_bytes(), &mut classes);
        Ok(classes)
    }

    fn collect_imports(&self, node: Node, source: &[u8], file_path: &Path, imports: &mut BTreeSet<String>) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    if let Some(module) = Self::imported_name(name, source) {
                        imports.insert(module);
                    }
                }
            }
            "import_from_statement" => self.collect_from_import(node, source, file_path, imports),
            _ => {
                for child in node.named_children(&mut node.walk()) {
                    self.collect_imports(child, source, file_path, imports);
                }
            }
        }
    }

    /// `from X import a, b`
    ///
    /// 能解析成子模块的符号记为 `X.a`；只要有一个符号解析不了，`X` 本身也算依赖。
    fn collect_from_import(&self, node: Node, source: &[u8], file_path: &Path, imports: &mut BTreeSet<String>) {
        let module_node = match node.child_by_field_name("module_name") {
            Some(n) => n,
            None => return,
        };

        let module = if module_node.kind() == "relative_import" {
            match self.resolve_relative(module_node, source, file_path) {
                Some(m) => m,
                None => {
                    tracing::debug!(
                        "Dropping relative import outside {}: {}",
                        self.root_display(),
                        text_of(module_node, source)
                    );
                    return;
                }
            }
        } else {
            dotted(module_node, source)
        };

        let is_wildcard = node
            .named_children(&mut node.walk())
            .any(|c| c.kind() == "wildcard_import");
        if is_wildcard {
            if !module.is_empty() {
                imports.insert(module);
            }
            return;
        }

        let mut unresolved = false;
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let symbol = match Self::imported_name(name, source) {
                Some(s) => s,
                None => continue,
            };

            let candidate = if module.is_empty() {
                symbol
            } else {
                format!("{}.{}", module, symbol)
            };

            if self.resolve_module(&candidate).is_some() {
                imports.insert(candidate);
            } else {
                unresolved = true;
            }
        }

        if unresolved && !module.is_empty() {
            imports.insert(module);
        }
    }

    /// `a.b` 或 `a.b as c` -> `a.b`
    fn imported_name(node: Node, source: &[u8]) -> Option<String> {
        let name_node = match node.kind() {
            "aliased_import" => node.child_by_field_name("name")?,
            "dotted_name" => node,
            _ => return None,
        };
        let name = dotted(name_node, source);
        (!name.is_empty()).then_some(name)
    }

    /// 相对导入转成绝对点分名：一个点是当前包，每多一个点上移一层
    fn resolve_relative(&self, node: Node, source: &[u8], file_path: &Path) -> Option<String> {
        let mut level = 0;
        let mut rest = None;
        for child in node.named_children(&mut node.walk()) {
            match child.kind() {
                "import_prefix" => level = text_of(child, source).matches('.').count(),
                "dotted_name" => rest = Some(dotted(child, source)),
                _ => {}
            }
        }

        let file_path = normalize_path(file_path);
        let relative = file_path.strip_prefix(&self.root).ok()?;
        let mut package: Vec<String> = relative
            .parent()?
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        for _ in 1..level {
            package.pop()?;
        }
        if let Some(rest) = rest {
            package.push(rest);
        }

        Some(package.join("."))
    }

    fn collect_classes(node: Node, source: &[u8], classes: &mut Vec<ClassDecl>) {
        if node.kind() == "class_definition" {
            if let Some(mut decl) = Self::class_decl(node, source) {
                if let Some(body) = node.child_by_field_name("body") {
                    Self::collect_classes(body, source, &mut decl.nested);
                }
                classes.push(decl);
            }
            return;
        }

        for child in node.named_children(&mut node.walk()) {
            Self::collect_classes(child, source, classes);
        }
    }

    fn class_decl(node: Node, source: &[u8]) -> Option<ClassDecl> {
        let name = node.child_by_field_name("name").map(|n| text_of(n, source))?;
        let mut decl = ClassDecl::new(&name);

        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            for arg in superclasses.named_children(&mut superclasses.walk()) {
                match arg.kind() {
                    "keyword_argument" => {
                        let key = arg.child_by_field_name("name").map(|n| text_of(n, source));
                        let value = arg
                            .child_by_field_name("value")
                            .and_then(|v| final_component(v, source));
                        if let (Some(key), Some(value)) = (key, value) {
                            decl.keywords.insert(key, value);
                        }
                    }
                    "comment" | "list_splat" | "dictionary_splat" => {}
                    _ => {
                        if let Some(base) = final_component(arg, source) {
                            decl.bases.push(base);
                        }
                    }
                }
            }
        }

        Some(decl)
    }
}

impl SourceParser for PythonParser {
    fn source_extension(&self) -> &str {
        SOURCE_EXTENSION
    }

    fn package_marker(&self) -> &str {
        PACKAGE_MARKER
    }

    /// 依次尝试 `a/b/c.py`、`a/b/c/__init__.py`、目录 `a/b/c`
    fn resolve_module(&self, target: &str) -> Option<PathBuf> {
        if target.is_empty() || target.split('.').any(str::is_empty) {
            return None;
        }

        let relative: PathBuf = target.split('.').collect();

        let module = normalize_path(&self.root.join(relative.with_extension(SOURCE_EXTENSION)));
        if module.exists() {
            return Some(module);
        }

        let package_dir = normalize_path(&self.root.join(&relative));
        let marker = package_dir.join(PACKAGE_MARKER);
        if marker.exists() {
            return Some(marker);
        }

        if package_dir.is_dir() {
            return Some(package_dir);
        }

        None
    }

    fn parse_imports(&self, path: &Path) -> Result<BTreeSet<String>> {
        let content = fs::read_to_string(path)?;
        self.imports_from_source(&content, path)
    }

    fn parse_classes(&self, path: &Path) -> Result<Vec<ClassDecl>> {
        let content = fs::read_to_string(path)?;
        Self::classes_from_source(&content, path)
    }

    fn is_abstract_class(&self, decl: &ClassDecl) -> bool {
        if decl.bases.iter().any(|b| ABSTRACT_MARKERS.contains(&b.as_str())) {
            return true;
        }

        decl.keywords
            .get("metaclass")
            .is_some_and(|m| ABSTRACT_MARKERS.contains(&m.as_str()))
    }
}

fn text_of(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

/// 点分名去掉空白 (`a . b` -> `a.b`)
fn dotted(node: Node, source: &[u8]) -> String {
    text_of(node, source).split_whitespace().collect()
}

/// 表达式只保留最后一段：`pkg.ABC` -> `ABC`，`Generic[T]` -> `Generic`
fn final_component(node: Node, source: &[u8]) -> Option<String> {
    let value = match node.kind() {
        "identifier" => text_of(node, source),
        "attribute" => node.child_by_field_name("attribute").map(|n| text_of(n, source))?,
        _ => {
            let text = text_of(node, source);
            let head = text.split(['[', '(']).next().unwrap_or("");
            head.rsplit('.').next().unwrap_or("").trim().to_string()
        }
    };
    (!value.is_empty()).then_some(value)
}
