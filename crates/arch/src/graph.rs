use indexmap::IndexMap;
use lang::ClassDecl;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// 节点种类：模块根节点，或带基类/关键字的类型声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    Class {
        bases: Vec<String>,
        keywords: BTreeMap<String, String>,
    },
}

/// 树节点，子节点按名字唯一、保留插入顺序
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    children: IndexMap<String, Node>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Module,
            children: IndexMap::new(),
        }
    }

    pub fn class(name: &str, bases: Vec<String>, keywords: BTreeMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Class { bases, keywords },
            children: IndexMap::new(),
        }
    }

    /// 声明树 -> 类节点树，嵌套关系保持不变
    pub fn from_decl(decl: &ClassDecl) -> Self {
        let mut node = Self::class(&decl.name, decl.bases.clone(), decl.keywords.clone());
        for nested in &decl.nested {
            node.add_child(Self::from_decl(nested));
        }
        node
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, NodeKind::Class { .. })
    }

    /// 还原成声明，供抽象判定使用
    pub fn to_decl(&self) -> Option<ClassDecl> {
        match &self.kind {
            NodeKind::Class { bases, keywords } => Some(ClassDecl {
                name: self.name.clone(),
                bases: bases.clone(),
                keywords: keywords.clone(),
                nested: Vec::new(),
            }),
            NodeKind::Module => None,
        }
    }

    /// 同名子节点会被替换，位置不变
    pub fn add_child(&mut self, node: Node) {
        self.children.insert(node.name.clone(), node);
    }

    pub fn get_child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn remove_child(&mut self, name: &str) -> Option<Node> {
        self.children.shift_remove(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// 结构相等：名字、种类、子节点集合逐层比较
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .all(|(name, child)| other.children.get(name) == Some(child))
    }
}

impl Eq for Node {}

/// 组件 - 一个源文件
///
/// 三个指标默认为 1，由 `calculate_*` 显式写入；相等性只看名字和节点。
#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    nodes: IndexMap<String, Node>,
    pub instability: f64,
    pub abstraction: f64,
    pub error: f64,
}

impl Component {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: IndexMap::new(),
            instability: 1.0,
            abstraction: 1.0,
            error: 1.0,
        }
    }

    /// 模块组件：一个与文件同名的根节点
    pub fn module(path: &str) -> Self {
        Self::new(path).with_node(Node::new(path))
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.add_node(node);
        self
    }

    pub fn with_metrics(mut self, instability: f64, abstraction: f64, error: f64) -> Self {
        self.instability = instability;
        self.abstraction = abstraction;
        self.error = error;
        self
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.name.clone(), node);
    }

    pub fn get_node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// 广度优先收集所有类节点，不论嵌套多深
    pub fn classes(&self) -> Vec<&Node> {
        let mut result = Vec::new();
        let mut queue: VecDeque<&Node> = self.nodes.values().collect();

        while let Some(node) = queue.pop_front() {
            if node.is_class() {
                result.push(node);
            }
            queue.extend(node.children());
        }

        result
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .all(|(name, node)| other.nodes.get(name) == Some(node))
    }
}

impl Eq for Component {}

/// 有向依赖边 source -> target
///
/// 端点按组件名记录；组件名在 Loader 内唯一，名字相等即组件相等。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

impl Link {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    pub fn between(source: &Component, target: &Component) -> Self {
        Self::new(&source.name, &target.name)
    }
}
