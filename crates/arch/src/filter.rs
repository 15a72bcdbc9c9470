//! 组件过滤谓词
//!
//! 过滤器是 字段 -> 条件 的映射，条件要么是字面量 (相等)，要么是 `[操作符, 值]`：
//!
//! ```json
//! {"instability": ["gte", 0.7], "name": ["match in", ["pkg/*", "*.py"]]}
//! ```
//!
//! 所有条件取与。

use crate::error::{ArchError, Result};
use crate::graph::Component;
use crate::pattern::PathGlob;
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;

/// 可过滤的组件字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Instability,
    Abstraction,
    Error,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Instability => "instability",
            Field::Abstraction => "abstraction",
            Field::Error => "error",
        }
    }

    pub fn value(self, component: &Component) -> Value {
        match self {
            Field::Name => Value::Text(component.name.clone()),
            Field::Instability => Value::Number(component.instability),
            Field::Abstraction => Value::Number(component.abstraction),
            Field::Error => Value::Number(component.error),
        }
    }
}

impl FromStr for Field {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(Field::Name),
            "instability" => Ok(Field::Instability),
            "abstraction" => Ok(Field::Abstraction),
            "error" => Ok(Field::Error),
            other => Err(ArchError::InvalidFilter(format!("unknown field '{}'", other))),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 字段值 / 比较值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    fn from_json(value: &Json) -> Result<Self> {
        match value {
            Json::String(s) => Ok(Value::Text(s.clone())),
            Json::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| ArchError::InvalidFilter(format!("unsupported number {}", n))),
            other => Err(ArchError::InvalidFilter(format!("unsupported value {}", other))),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    fn as_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

#[derive(Debug, Clone)]
pub enum Operator {
    Eq(Value),
    NotEq(Value),
    Match(PathGlob),
    MatchIn(Vec<PathGlob>),
    Gte(f64),
    Lte(f64),
    Lt(f64),
    Gt(f64),
}

impl Operator {
    /// 由操作符名和 JSON 操作数构造；未知操作符属于配置错误
    pub fn parse(name: &str, operand: &Json) -> Result<Self> {
        let number = || {
            operand.as_f64().ok_or_else(|| {
                ArchError::InvalidFilter(format!("operator '{}' expects a number, got {}", name, operand))
            })
        };

        match name {
            "eq" => Ok(Operator::Eq(Value::from_json(operand)?)),
            "not eq" => Ok(Operator::NotEq(Value::from_json(operand)?)),
            "match" => {
                let pattern = operand.as_str().ok_or_else(|| {
                    ArchError::InvalidFilter(format!("operator 'match' expects a glob, got {}", operand))
                })?;
                Ok(Operator::Match(PathGlob::new(pattern)?))
            }
            "match in" => {
                let items = operand.as_array().ok_or_else(|| {
                    ArchError::InvalidFilter(format!("operator 'match in' expects a list, got {}", operand))
                })?;
                let globs = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .ok_or_else(|| ArchError::InvalidFilter(format!("expected a glob, got {}", item)))
                            .and_then(PathGlob::new)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Operator::MatchIn(globs))
            }
            "gte" => Ok(Operator::Gte(number()?)),
            "lte" => Ok(Operator::Lte(number()?)),
            "lt" => Ok(Operator::Lt(number()?)),
            "gt" => Ok(Operator::Gt(number()?)),
            other => Err(ArchError::InvalidFilter(format!("unknown operator '{}'", other))),
        }
    }

    pub fn evaluate(&self, attribute: &Value) -> bool {
        match self {
            Operator::Eq(expected) => attribute == expected,
            Operator::NotEq(expected) => attribute != expected,
            Operator::Match(glob) => glob.matches(&attribute.as_text()),
            Operator::MatchIn(globs) => {
                let text = attribute.as_text();
                globs.iter().any(|g| g.matches(&text))
            }
            Operator::Gte(bound) => attribute.as_number().is_some_and(|v| v >= *bound),
            Operator::Lte(bound) => attribute.as_number().is_some_and(|v| v <= *bound),
            Operator::Lt(bound) => attribute.as_number().is_some_and(|v| v < *bound),
            Operator::Gt(bound) => attribute.as_number().is_some_and(|v| v > *bound),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: Field,
    pub operator: Operator,
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// 空过滤器，放行所有组件
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, operator: Operator) -> Self {
        self.conditions.push(Condition { field, operator });
        self
    }

    /// `name` 命中任一 glob；空列表得到空过滤器
    pub fn name_matches_any(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::new());
        }
        let globs = patterns
            .iter()
            .map(|p| PathGlob::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new().with(Field::Name, Operator::MatchIn(globs)))
    }

    pub fn from_json(value: &Json) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ArchError::InvalidFilter(format!("expected an object, got {}", value)))?;

        let mut filter = Self::new();
        for (key, condition) in object {
            let field: Field = key.parse()?;
            let operator = match condition {
                Json::Array(pair) => match pair.as_slice() {
                    [Json::String(name), operand] => Operator::parse(name, operand)?,
                    _ => {
                        return Err(ArchError::InvalidFilter(format!(
                            "condition on '{}' must be [operator, value], got {}",
                            key, condition
                        )))
                    }
                },
                literal => Operator::Eq(Value::from_json(literal)?),
            };
            filter = filter.with(field, operator);
        }
        Ok(filter)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let value: Json =
            serde_json::from_str(text).map_err(|e| ArchError::InvalidFilter(e.to_string()))?;
        Self::from_json(&value)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, component: &Component) -> bool {
        self.conditions
            .iter()
            .all(|c| c.operator.evaluate(&c.field.value(component)))
    }
}
