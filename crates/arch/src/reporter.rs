//! 报表
//!
//! `Reporter` 从 `ComponentGraph` 生成两种报表：AS 平面指标表，和组件关系矩阵。
//! 文本/HTML 渲染不在这里，这里只负责结构和格式兼容性检查。

use crate::error::{ArchError, Result};
use crate::filter::Filter;
use crate::graph::Component;
use crate::loader::ComponentGraph;
use crate::uml::UmlGenerator;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub name: String,
    pub instability: f64,
    pub abstraction: f64,
    pub error: f64,
}

impl MetricRow {
    fn of(component: &Component) -> Self {
        Self {
            name: component.name.clone(),
            instability: component.instability,
            abstraction: component.abstraction,
            error: component.error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportRow {
    Component(MetricRow),
    /// 空白分隔行
    Separator,
    Mean(MetricRow),
}

/// AS 平面报表：每个组件一行，末尾是分隔行和 Mean 行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub name: String,
    pub description: String,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl MetricsReport {
    pub fn components(&self) -> impl Iterator<Item = &MetricRow> {
        self.rows.iter().filter_map(|row| match row {
            ReportRow::Component(r) => Some(r),
            _ => None,
        })
    }

    pub fn mean(&self) -> Option<&MetricRow> {
        self.rows.iter().find_map(|row| match row {
            ReportRow::Mean(r) => Some(r),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRow {
    pub label: usize,
    pub cells: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: usize,
    pub name: String,
}

/// 组件关系矩阵：`rows[r].cells[c] == 1` 表示 r 依赖 c
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkReport {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<LinkRow>,
    pub legend: Vec<LegendEntry>,
}

impl LinkReport {
    pub fn name_of(&self, label: usize) -> Option<&str> {
        self.legend
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.name.as_str())
    }

    /// 图例文本，附在矩阵下方
    pub fn footer(&self) -> String {
        let mut footer = String::from("\nLabels:\n");
        for entry in &self.legend {
            footer.push_str(&format!("{}: {}\n", entry.label, entry.name));
        }
        footer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Metrics,
    Links,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Metrics => "metrics",
            ReportKind::Links => "link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Metrics(MetricsReport),
    Links(LinkReport),
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Metrics(_) => ReportKind::Metrics,
            Report::Links(_) => ReportKind::Links,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Report::Metrics(r) => &r.name,
            Report::Links(r) => &r.name,
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Basic,
    Html,
    Json,
    MeanI,
    MeanA,
    MeanE,
    Uml,
    Img,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Basic => "basic",
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::MeanI => "mean_i",
            ReportFormat::MeanA => "mean_a",
            ReportFormat::MeanE => "mean_e",
            ReportFormat::Uml => "uml",
            ReportFormat::Img => "img",
        }
    }

    pub fn supports(self, kind: ReportKind) -> bool {
        match self {
            ReportFormat::Basic | ReportFormat::Html | ReportFormat::Json => true,
            ReportFormat::MeanI | ReportFormat::MeanA | ReportFormat::MeanE => {
                kind == ReportKind::Metrics
            }
            ReportFormat::Uml | ReportFormat::Img => kind == ReportKind::Links,
        }
    }

    pub fn ensure_supports(self, kind: ReportKind) -> Result<()> {
        if self.supports(kind) {
            Ok(())
        } else {
            Err(ArchError::FormatMismatch {
                format: self.as_str().to_string(),
                kind: kind.as_str().to_string(),
            })
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ReportFormat::Basic),
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            "mean_i" => Ok(ReportFormat::MeanI),
            "mean_a" => Ok(ReportFormat::MeanA),
            "mean_e" | "mean" => Ok(ReportFormat::MeanE),
            "uml" => Ok(ReportFormat::Uml),
            "img" => Ok(ReportFormat::Img),
            other => Err(format!(
                "unknown format '{}' (expected basic, html, json, mean_i, mean_a, mean_e, mean, uml or img)",
                other
            )),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 格式化结果，交给视图层输出
#[derive(Debug, Clone, PartialEq)]
pub enum FormattedReport<'a> {
    Table(&'a Report),
    Scalar(f64),
    Uml(String),
}

/// 先检查格式与报表种类是否兼容，不兼容时不做任何格式化
pub fn format_report(report: &Report, format: ReportFormat) -> Result<FormattedReport<'_>> {
    format.ensure_supports(report.kind())?;

    let formatted = match (format, report) {
        (ReportFormat::Basic | ReportFormat::Html | ReportFormat::Json, _) => {
            FormattedReport::Table(report)
        }
        (ReportFormat::MeanI, Report::Metrics(r)) => {
            FormattedReport::Scalar(r.mean().map_or(0.0, |m| m.instability))
        }
        (ReportFormat::MeanA, Report::Metrics(r)) => {
            FormattedReport::Scalar(r.mean().map_or(0.0, |m| m.abstraction))
        }
        (ReportFormat::MeanE, Report::Metrics(r)) => {
            FormattedReport::Scalar(r.mean().map_or(0.0, |m| m.error))
        }
        (ReportFormat::Uml | ReportFormat::Img, Report::Links(r)) => {
            FormattedReport::Uml(UmlGenerator::new().generate(r)?)
        }
        (format, report) => {
            return Err(ArchError::FormatMismatch {
                format: format.as_str().to_string(),
                kind: report.kind().as_str().to_string(),
            })
        }
    };

    Ok(formatted)
}

pub struct Reporter<'a, G: ComponentGraph> {
    graph: &'a mut G,
}

impl<'a, G: ComponentGraph> Reporter<'a, G> {
    pub fn new(graph: &'a mut G) -> Self {
        Self { graph }
    }

    /// 重新计算指标 (I -> A -> E) 后生成 AS 平面报表
    ///
    /// Mean 行总是基于全部组件，不受过滤器影响。
    pub fn get_as_report(&mut self, filter: &Filter) -> MetricsReport {
        self.graph.calculate_instability();
        self.graph.calculate_abstraction();
        self.graph.calculate_error();

        let mut rows: Vec<ReportRow> = self
            .graph
            .get_components()
            .into_iter()
            .filter(|c| filter.matches(c))
            .map(|c| ReportRow::Component(MetricRow::of(c)))
            .collect();

        rows.push(ReportRow::Separator);
        rows.push(ReportRow::Mean(MetricRow {
            name: "Mean".to_string(),
            instability: self.graph.calculate_mean_instability(),
            abstraction: self.graph.calculate_mean_abstraction(),
            error: self.graph.calculate_mean_error(),
        }));

        MetricsReport {
            name: "AS plane".to_string(),
            description: "Abstract Stability Report".to_string(),
            columns: ["Component", "I", "A", "E"].map(String::from).to_vec(),
            rows,
        }
    }

    /// 按当前链接生成关系矩阵，标签从 1 开始
    pub fn get_component_links_report(&self, filter: &Filter) -> LinkReport {
        let selected: Vec<&Component> = self
            .graph
            .get_components()
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();

        let edges: HashSet<(&str, &str)> = self
            .graph
            .get_links()
            .iter()
            .map(|l| (l.source.as_str(), l.target.as_str()))
            .collect();

        let rows = selected
            .iter()
            .enumerate()
            .map(|(i, source)| LinkRow {
                label: i + 1,
                cells: selected
                    .iter()
                    .map(|target| u8::from(edges.contains(&(source.name.as_str(), target.name.as_str()))))
                    .collect(),
            })
            .collect();

        let legend = selected
            .iter()
            .enumerate()
            .map(|(i, c)| LegendEntry {
                label: i + 1,
                name: c.name.clone(),
            })
            .collect();

        let mut columns = vec!["Components".to_string()];
        columns.extend((1..=selected.len()).map(|label| label.to_string()));

        LinkReport {
            name: "Link Report".to_string(),
            columns,
            rows,
            legend,
        }
    }
}
