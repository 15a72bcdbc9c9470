use crate::error::{ArchError, Result};
use crate::graph::{Component, Link, Node};
use crate::metrics;
use crate::pattern::{self, PathGlob};
use glob::Pattern;
use indexmap::IndexMap;
use lang::{normalize_path, ClassDecl, SourceParser};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 组件图 - Reporter 依赖的接口
///
/// 指标计算顺序固定：instability -> abstraction -> error。
pub trait ComponentGraph {
    fn get_components(&self) -> Vec<&Component>;

    fn get_links(&self) -> &[Link];

    fn calculate_instability(&mut self);

    fn calculate_abstraction(&mut self);

    /// 只读取已有的 instability / abstraction，不会重新计算
    fn calculate_error(&mut self);

    fn calculate_mean_instability(&self) -> f64 {
        metrics::mean(self.get_components().iter().map(|c| c.instability))
    }

    fn calculate_mean_abstraction(&self) -> f64 {
        metrics::mean(self.get_components().iter().map(|c| c.abstraction))
    }

    fn calculate_mean_error(&self) -> f64 {
        metrics::mean(self.get_components().iter().map(|c| c.error))
    }
}

/// 组件加载器
///
/// 发现 -> 排除 -> 链接 -> 类型 -> 指标，单一所有者，顺序执行。
pub struct Loader<P: SourceParser> {
    parser: P,
    /// 组件名 -> 组件，保持发现顺序
    components: IndexMap<String, Component>,
    links: Vec<Link>,
    ignored_dependencies: Vec<Pattern>,
    links_loaded: bool,
    classes_loaded: bool,
}

impl<P: SourceParser> Loader<P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            components: IndexMap::new(),
            links: Vec::new(),
            ignored_dependencies: Vec::new(),
            links_loaded: false,
            classes_loaded: false,
        }
    }

    /// 用现成的组件和链接构建；链接视为已加载
    pub fn from_graph(parser: P, components: Vec<Component>, links: Vec<Link>) -> Self {
        let mut loader = Self::new(parser);
        for component in components {
            loader.add_component(component);
        }
        loader.links = links;
        loader.links_loaded = true;
        loader
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// 忽略匹配这些 glob 的导入目标 (点分名)
    pub fn ignore_dependencies(&mut self, patterns: &[String]) -> Result<()> {
        self.ignored_dependencies = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ArchError::InvalidPattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    /// 发现组件并立即应用排除规则
    pub fn load_components(
        &mut self,
        paths: &[impl AsRef<Path>],
        exclude: &[String],
        exclude_packages: bool,
    ) -> Result<()> {
        let mut rules = pattern::compile_all(exclude)?;
        if exclude_packages {
            rules.push(PathGlob::new(self.parser.package_marker())?);
        }

        let modules = self.discover_modules(paths)?;
        tracing::info!("Discovered {} source files", modules.len());
        self.add_modules(modules);

        let removed = self.exclude_components(&rules);
        if removed > 0 {
            tracing::info!("Excluded {} components", removed);
        }
        Ok(())
    }

    /// 递归遍历：每个目录内先处理文件再进入子目录，同类按名字排序
    fn discover_modules(&self, paths: &[impl AsRef<Path>]) -> Result<Vec<PathBuf>> {
        let mut discovered = Vec::new();

        for root in paths {
            let root = root.as_ref();
            let walker = WalkDir::new(root).sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            });

            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) if e.depth() == 0 => {
                        return Err(ArchError::Discovery {
                            path: root.display().to_string(),
                            source: e.into(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                        continue;
                    }
                };

                let path = entry.path();
                if path.is_file() && self.parser.is_source_file(path) {
                    discovered.push(normalize_path(path));
                }
            }
        }

        Ok(discovered)
    }

    fn add_modules(&mut self, modules: Vec<PathBuf>) {
        for module in modules {
            let name = module.to_string_lossy().into_owned();
            self.components
                .entry(name.clone())
                .or_insert_with(|| Component::module(&name));
        }
    }

    fn exclude_components(&mut self, rules: &[PathGlob]) -> usize {
        if rules.is_empty() {
            return 0;
        }

        let before = self.components.len();
        self.components.retain(|name, _| {
            let excluded = pattern::matches_any(rules, name);
            if excluded {
                tracing::debug!("Excluding {}", name);
            }
            !excluded
        });
        before - self.components.len()
    }

    /// 解析所有组件的导入并建立链接
    ///
    /// 组件表在此之前必须完整。各文件并行解析，全部完成后才开始解析目标，
    /// 链接按组件顺序依次写入。重复调用不会产生重复链接。
    pub fn load_links(&mut self) {
        let sources: Vec<(String, Vec<String>)> = self
            .components
            .values()
            .map(|c| (c.name.clone(), c.nodes().map(|n| n.name.clone()).collect()))
            .collect();

        let parser = &self.parser;
        let imports: Vec<(String, BTreeSet<String>)> = sources
            .into_par_iter()
            .map(|(name, nodes)| {
                let mut targets = BTreeSet::new();
                for node in &nodes {
                    targets.extend(parser.get_imports(Path::new(node)));
                }
                (name, targets)
            })
            .collect();

        let mut created = 0;
        for (source, targets) in imports {
            for target in targets {
                if self.is_ignored(&target) {
                    tracing::debug!("Ignoring dependency {} -> {}", source, target);
                    continue;
                }

                let resolved = match self.search_module(&target) {
                    Some(r) => r,
                    None => {
                        tracing::debug!("External dependency {} -> {}", source, target);
                        continue;
                    }
                };

                if !self.components.contains_key(&resolved) {
                    continue;
                }

                if self.add_link(&source, &resolved) {
                    created += 1;
                }
            }
        }

        self.links_loaded = true;
        tracing::info!("Loaded {} links across {} components", created, self.components.len());
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored_dependencies.iter().any(|p| p.matches(target))
    }

    /// 导入目标 -> 组件名；找不到时去掉最后一段再试一次
    pub fn search_module(&self, target: &str) -> Option<String> {
        let mut attempts = vec![target];
        if let Some((parent, _)) = target.rsplit_once('.') {
            attempts.push(parent);
        }

        attempts
            .into_iter()
            .find_map(|t| self.parser.resolve_module(t))
            .map(|p| p.to_string_lossy().into_owned())
    }

    /// 去重插入
    fn add_link(&mut self, source: &str, target: &str) -> bool {
        let link = Link::new(source, target);
        if self.links.contains(&link) {
            return false;
        }
        tracing::debug!("Link {} -> {}", source, target);
        self.links.push(link);
        true
    }

    /// 把声明的类型挂到根节点下；已有子节点的节点跳过
    pub fn load_classes(&mut self) {
        let pending: Vec<(String, String)> = self
            .components
            .values()
            .flat_map(|c| {
                c.nodes()
                    .filter(|n| !n.has_children())
                    .map(|n| (c.name.clone(), n.name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        let parser = &self.parser;
        let parsed: Vec<(String, String, Vec<ClassDecl>)> = pending
            .into_par_iter()
            .map(|(component, node)| {
                let classes = parser.get_classes(Path::new(&node));
                (component, node, classes)
            })
            .collect();

        for (component, node, classes) in parsed {
            let target = self
                .components
                .get_mut(&component)
                .and_then(|c| c.get_node_mut(&node));
            if let Some(target) = target {
                for decl in &classes {
                    target.add_child(Node::from_decl(decl));
                }
            }
        }

        self.classes_loaded = true;
    }

    pub fn calculate_instability(&mut self) {
        if !self.links_loaded {
            self.load_links();
        }

        for component in self.components.values_mut() {
            let (in_deps, out_deps) = dependency_counts(&self.links, &component.name);
            component.instability = metrics::instability(in_deps, out_deps);
        }
    }

    pub fn calculate_abstraction(&mut self) {
        if !self.classes_loaded {
            self.load_classes();
        }

        for component in self.components.values_mut() {
            let mut abstract_count = 0;
            let mut concrete_count = 0;
            for class in component.classes() {
                let is_abstract = class
                    .to_decl()
                    .is_some_and(|decl| self.parser.is_abstract_class(&decl));
                if is_abstract {
                    abstract_count += 1;
                } else {
                    concrete_count += 1;
                }
            }
            component.abstraction = metrics::abstraction(abstract_count, concrete_count);
        }
    }

    pub fn calculate_error(&mut self) {
        for component in self.components.values_mut() {
            component.error = metrics::error(component.instability, component.abstraction);
        }
    }

    pub fn get_component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn get_components(&self) -> Vec<&Component> {
        self.components.values().collect()
    }

    pub fn get_links(&self) -> &[Link] {
        &self.links
    }

    pub fn add_component(&mut self, component: Component) {
        self.components.insert(component.name.clone(), component);
    }

    /// 直接追加链接，不去重
    pub fn link_component(&mut self, source: &str, target: &str) {
        self.links.push(Link::new(source, target));
    }
}

impl<P: SourceParser> ComponentGraph for Loader<P> {
    fn get_components(&self) -> Vec<&Component> {
        Loader::get_components(self)
    }

    fn get_links(&self) -> &[Link] {
        Loader::get_links(self)
    }

    fn calculate_instability(&mut self) {
        Loader::calculate_instability(self)
    }

    fn calculate_abstraction(&mut self) {
        Loader::calculate_abstraction(self)
    }

    fn calculate_error(&mut self) {
        Loader::calculate_error(self)
    }
}

/// (Cin, Cout)；自依赖只算出度
fn dependency_counts(links: &[Link], name: &str) -> (usize, usize) {
    links.iter().fold((0, 0), |(in_deps, out_deps), link| {
        (
            in_deps + usize::from(link.target == name && link.source != name),
            out_deps + usize::from(link.source == name),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// 内存中的前端：导入、类型、模块解析都由表决定
    #[derive(Default)]
    struct StubParser {
        imports: HashMap<String, Vec<String>>,
        classes: HashMap<String, Vec<ClassDecl>>,
        modules: HashMap<String, String>,
    }

    impl StubParser {
        fn with_module(mut self, target: &str, path: &str) -> Self {
            self.modules.insert(target.to_string(), path.to_string());
            self
        }

        fn with_imports(mut self, path: &str, targets: &[&str]) -> Self {
            self.imports
                .insert(path.to_string(), targets.iter().map(|t| t.to_string()).collect());
            self
        }

        fn with_classes(mut self, path: &str, classes: Vec<ClassDecl>) -> Self {
            self.classes.insert(path.to_string(), classes);
            self
        }
    }

    impl SourceParser for StubParser {
        fn source_extension(&self) -> &str {
            "py"
        }

        fn package_marker(&self) -> &str {
            "__init__.py"
        }

        fn resolve_module(&self, target: &str) -> Option<PathBuf> {
            self.modules.get(target).map(PathBuf::from)
        }

        fn parse_imports(&self, path: &Path) -> lang::Result<BTreeSet<String>> {
            let key = path.to_string_lossy().into_owned();
            Ok(self.imports.get(&key).into_iter().flatten().cloned().collect())
        }

        fn parse_classes(&self, path: &Path) -> lang::Result<Vec<ClassDecl>> {
            let key = path.to_string_lossy().into_owned();
            Ok(self.classes.get(&key).cloned().unwrap_or_default())
        }

        fn is_abstract_class(&self, decl: &ClassDecl) -> bool {
            decl.bases.iter().any(|b| b == "ABC")
        }
    }

    fn diamond() -> Loader<StubParser> {
        let parser = StubParser::default()
            .with_module("a", "a.py")
            .with_module("b", "b.py")
            .with_module("c", "c.py")
            .with_module("d", "d.py")
            .with_imports("a.py", &["b", "c", "os"])
            .with_imports("b.py", &["d"])
            .with_imports("c.py", &["d.Thing"]);

        let mut loader = Loader::new(parser);
        for name in ["a.py", "b.py", "c.py", "d.py"] {
            loader.add_component(Component::module(name));
        }
        loader
    }

    fn instability_of(loader: &Loader<StubParser>, name: &str) -> f64 {
        loader.get_component(name).unwrap().instability
    }

    #[test]
    fn test_diamond_instability() {
        let mut loader = diamond();
        loader.calculate_instability();

        assert_eq!(loader.get_links().len(), 4);
        assert_eq!(instability_of(&loader, "a.py"), 1.0);
        assert_eq!(instability_of(&loader, "b.py"), 0.5);
        assert_eq!(instability_of(&loader, "c.py"), 0.5);
        assert_eq!(instability_of(&loader, "d.py"), 0.0);
    }

    #[test]
    fn test_isolated_component_is_unstable() {
        let mut loader = diamond();
        loader.add_component(Component::module("lonely.py"));
        loader.calculate_instability();

        assert_eq!(instability_of(&loader, "lonely.py"), 1.0);
    }

    #[test]
    fn test_load_links_twice_keeps_links_unique() {
        let mut loader = diamond();
        loader.load_links();
        loader.load_links();

        assert_eq!(
            loader.get_links(),
            &[
                Link::new("a.py", "b.py"),
                Link::new("a.py", "c.py"),
                Link::new("b.py", "d.py"),
                Link::new("c.py", "d.py"),
            ]
        );
    }

    #[test]
    fn test_same_dependency_twice_yields_one_link() {
        let parser = StubParser::default()
            .with_module("b", "b.py")
            .with_imports("a.py", &["b", "b.Thing", "b.Other"]);
        let mut loader = Loader::new(parser);
        loader.add_component(Component::module("a.py"));
        loader.add_component(Component::module("b.py"));

        loader.load_links();
        assert_eq!(loader.get_links(), &[Link::new("a.py", "b.py")]);
    }

    #[test]
    fn test_link_component_bypasses_dedup() {
        let mut loader = diamond();
        loader.link_component("a.py", "b.py");
        loader.link_component("a.py", "b.py");
        assert_eq!(loader.get_links().len(), 2);
    }

    #[test]
    fn test_unknown_component_target_ignored() {
        let parser = StubParser::default()
            .with_module("vendor", "vendor/lib.py")
            .with_imports("a.py", &["vendor"]);
        let mut loader = Loader::new(parser);
        loader.add_component(Component::module("a.py"));

        loader.load_links();
        assert!(loader.get_links().is_empty());
    }

    #[test]
    fn test_ignored_dependencies_skip_links() {
        let mut loader = diamond();
        loader.ignore_dependencies(&["d*".to_string()]).unwrap();
        loader.load_links();

        assert_eq!(
            loader.get_links(),
            &[Link::new("a.py", "b.py"), Link::new("a.py", "c.py")]
        );
    }

    #[test]
    fn test_invalid_ignore_pattern_rejected() {
        let mut loader = diamond();
        let result = loader.ignore_dependencies(&["[oops".to_string()]);
        assert!(matches!(result, Err(ArchError::InvalidPattern { .. })));
    }

    fn with_classes() -> Loader<StubParser> {
        let parser = StubParser::default()
            .with_classes(
                "mixed.py",
                vec![
                    ClassDecl::new("Port").with_base("ABC"),
                    ClassDecl::new("Adapter")
                        .with_base("Port")
                        .with_nested(ClassDecl::new("Config")),
                    ClassDecl::new("Plugin").with_base("ABC"),
                ],
            )
            .with_classes("abstract.py", vec![ClassDecl::new("Base").with_base("ABC")])
            .with_classes("concrete.py", vec![ClassDecl::new("Impl")]);

        let mut loader = Loader::new(parser);
        for name in ["mixed.py", "abstract.py", "concrete.py", "empty.py"] {
            loader.add_component(Component::module(name));
        }
        loader
    }

    #[test]
    fn test_abstraction() {
        let mut loader = with_classes();
        loader.calculate_abstraction();

        let abstraction = |name: &str| loader.get_component(name).unwrap().abstraction;
        assert_eq!(abstraction("mixed.py"), 0.5);
        assert_eq!(abstraction("abstract.py"), 1.0);
        assert_eq!(abstraction("concrete.py"), 0.0);
        assert_eq!(abstraction("empty.py"), 1.0);
    }

    #[test]
    fn test_load_classes_nests_and_is_idempotent() {
        let mut loader = with_classes();
        loader.load_classes();
        let once: Vec<Component> = loader.get_components().into_iter().cloned().collect();

        loader.load_classes();
        let twice: Vec<Component> = loader.get_components().into_iter().cloned().collect();

        assert_eq!(once, twice);

        let root = loader.get_component("mixed.py").unwrap().get_node("mixed.py").unwrap();
        assert_eq!(root.children().count(), 3);
        let adapter = root.get_child("Adapter").unwrap();
        assert!(adapter.get_child("Config").is_some());
        assert_eq!(loader.get_component("mixed.py").unwrap().classes().len(), 4);
    }

    #[test]
    fn test_error_uses_existing_metrics() {
        let mut loader = Loader::from_graph(
            StubParser::default(),
            vec![
                Component::new("x").with_metrics(0.5, 0.5, 1.0),
                Component::new("y").with_metrics(0.0, 0.0, 0.0),
            ],
            vec![],
        );
        loader.calculate_error();

        assert_eq!(loader.get_component("x").unwrap().error, 0.0);
        assert_eq!(loader.get_component("y").unwrap().error, 1.0);
    }

    #[test]
    fn test_full_metric_order() {
        let mut loader = diamond();
        loader.calculate_instability();
        loader.calculate_abstraction();
        loader.calculate_error();

        // 没有类型声明，A = 1
        let d = loader.get_component("d.py").unwrap();
        assert_eq!((d.instability, d.abstraction, d.error), (0.0, 1.0, 0.0));
        let a = loader.get_component("a.py").unwrap();
        assert_eq!((a.instability, a.abstraction, a.error), (1.0, 1.0, 1.0));

        assert_eq!(loader.calculate_mean_instability(), 0.5);
        assert_eq!(loader.calculate_mean_abstraction(), 1.0);
        assert_eq!(loader.calculate_mean_error(), 0.5);
    }

    #[test]
    fn test_means_of_empty_loader_are_zero() {
        let loader = Loader::new(StubParser::default());
        assert_eq!(loader.calculate_mean_instability(), 0.0);
        assert_eq!(loader.calculate_mean_abstraction(), 0.0);
        assert_eq!(loader.calculate_mean_error(), 0.0);
    }

    #[test]
    fn test_self_import_counts_as_outgoing_only() {
        let parser = StubParser::default()
            .with_module("pkg", "pkg/__init__.py")
            .with_imports("pkg/__init__.py", &["pkg"]);
        let mut loader = Loader::new(parser);
        loader.add_component(Component::module("pkg/__init__.py"));

        loader.calculate_instability();

        assert_eq!(
            loader.get_links(),
            &[Link::new("pkg/__init__.py", "pkg/__init__.py")]
        );
        assert_eq!(instability_of(&loader, "pkg/__init__.py"), 1.0);
    }

    #[test]
    fn test_self_link_does_not_add_inbound() {
        let mut loader = Loader::from_graph(
            StubParser::default(),
            vec![Component::new("a"), Component::new("b")],
            vec![Link::new("a", "a"), Link::new("b", "a")],
        );
        loader.calculate_instability();

        // a: Cout = 1 (自身), Cin = 1 (来自 b)
        assert_eq!(instability_of(&loader, "a"), 0.5);
        assert_eq!(instability_of(&loader, "b"), 1.0);
    }

    #[test]
    fn test_from_graph_does_not_reload_links() {
        let parser = StubParser::default()
            .with_module("b", "b.py")
            .with_imports("a.py", &["b"]);
        let mut loader = Loader::from_graph(
            parser,
            vec![Component::module("a.py"), Component::module("b.py")],
            vec![],
        );
        loader.calculate_instability();

        assert!(loader.get_links().is_empty());
        assert_eq!(instability_of(&loader, "a.py"), 1.0);
    }

    #[test]
    fn test_search_module_retries_parent() {
        let loader = diamond();
        assert_eq!(loader.search_module("d.Thing"), Some("d.py".to_string()));
        assert_eq!(loader.search_module("b"), Some("b.py".to_string()));
        assert_eq!(loader.search_module("x.y.z"), None);
        assert_eq!(loader.search_module("os"), None);
    }
}
