//! arch - 组件架构指标
//!
//! 组件发现、依赖图构建、Martin 指标 (I / A / E)、过滤和报表

mod error;
mod filter;
mod graph;
mod loader;
pub mod metrics;
mod pattern;
mod reporter;
mod uml;

pub use error::{ArchError, Result};
pub use filter::{Condition, Field, Filter, Operator, Value};
pub use graph::{Component, Link, Node, NodeKind};
pub use loader::{ComponentGraph, Loader};
pub use pattern::PathGlob;
pub use reporter::{
    format_report, FormattedReport, LegendEntry, LinkReport, LinkRow, MetricRow, MetricsReport,
    Report, ReportFormat, ReportKind, ReportRow, Reporter,
};
pub use uml::UmlGenerator;
