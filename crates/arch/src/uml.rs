use crate::error::{ArchError, Result};
use crate::reporter::LinkReport;

/// PlantUML 组件图生成器
pub struct UmlGenerator {
    header: String,
    footer: String,
}

impl UmlGenerator {
    pub fn new() -> Self {
        Self {
            header: "@startuml".to_string(),
            footer: "@enduml".to_string(),
        }
    }

    /// 从关系矩阵生成组件图
    ///
    /// 先按图例顺序声明组件，再按行优先顺序输出每条依赖。
    pub fn generate(&self, report: &LinkReport) -> Result<String> {
        let mut lines = vec![self.header.clone()];

        for entry in &report.legend {
            lines.push(format!("component [{}]", entry.name));
        }

        for row in &report.rows {
            let source = Self::resolve(report, row.label)?;
            for (index, cell) in row.cells.iter().enumerate() {
                if *cell == 1 {
                    let target = Self::resolve(report, index + 1)?;
                    lines.push(format!("[{}] --> [{}]", source, target));
                }
            }
        }

        lines.push(self.footer.clone());
        Ok(lines.join("\n"))
    }

    fn resolve(report: &LinkReport, label: usize) -> Result<&str> {
        report
            .name_of(label)
            .ok_or_else(|| ArchError::MissingLegend(label.to_string()))
    }
}

impl Default for UmlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{LegendEntry, LinkRow};

    fn report(legend: &[&str], matrix: &[&[u8]]) -> LinkReport {
        LinkReport {
            name: "Link Report".to_string(),
            columns: Vec::new(),
            rows: matrix
                .iter()
                .enumerate()
                .map(|(i, cells)| LinkRow {
                    label: i + 1,
                    cells: cells.to_vec(),
                })
                .collect(),
            legend: legend
                .iter()
                .enumerate()
                .map(|(i, name)| LegendEntry {
                    label: i + 1,
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_generate_components_then_links() {
        let report = report(&["A", "B", "C"], &[&[0, 1, 1], &[0, 0, 1], &[0, 0, 0]]);
        let uml = UmlGenerator::new().generate(&report).unwrap();

        assert_eq!(
            uml,
            "@startuml\n\
             component [A]\n\
             component [B]\n\
             component [C]\n\
             [A] --> [B]\n\
             [A] --> [C]\n\
             [B] --> [C]\n\
             @enduml"
        );
    }

    #[test]
    fn test_components_follow_legend_order() {
        let mut report = report(&["A", "B"], &[&[0, 1], &[0, 0]]);
        report.legend.reverse();

        let uml = UmlGenerator::new().generate(&report).unwrap();
        assert_eq!(
            uml,
            "@startuml\ncomponent [B]\ncomponent [A]\n[A] --> [B]\n@enduml"
        );
    }

    #[test]
    fn test_empty_report() {
        let uml = UmlGenerator::new().generate(&report(&[], &[])).unwrap();
        assert_eq!(uml, "@startuml\n@enduml");
    }

    #[test]
    fn test_missing_legend_is_error() {
        let report = report(&["A"], &[&[0, 1], &[0, 0]]);
        let result = UmlGenerator::new().generate(&report);
        assert!(matches!(result, Err(ArchError::MissingLegend(label)) if label == "2"));
    }
}
