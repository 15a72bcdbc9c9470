use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Syntax error in {0}")]
    Syntax(String),
    #[error("Language error: {0}")]
    Language(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// 类型声明 - 名字、基类、关键字参数，以及源码中嵌套的声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    /// 基类标识符，只保留最后一段 (`pkg.ABC` -> `ABC`)
    pub bases: Vec<String>,
    /// 关键字参数，如 `metaclass=abc.ABCMeta` -> `{"metaclass": "ABCMeta"}`
    pub keywords: BTreeMap<String, String>,
    pub nested: Vec<ClassDecl>,
}

impl ClassDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bases: Vec::new(),
            keywords: BTreeMap::new(),
            nested: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.bases.push(base.to_string());
        self
    }

    pub fn with_keyword(mut self, name: &str, value: &str) -> Self {
        self.keywords.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_nested(mut self, decl: ClassDecl) -> Self {
        self.nested.push(decl);
        self
    }

    /// 先序展开自身与所有嵌套声明
    pub fn flatten(&self) -> Vec<&ClassDecl> {
        let mut result = vec![self];
        for child in &self.nested {
            result.extend(child.flatten());
        }
        result
    }
}
