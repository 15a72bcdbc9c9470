//! report / rel subcommands

use crate::config::Config;
use crate::exporters::{DiagramRenderer, Exporter, FileExporter, Pack, PlantUmlServer};
use crate::views;
use anyhow::Context;
use arch::{format_report, Filter, FormattedReport, Loader, Report, ReportFormat, ReportKind, Reporter};
use clap::Args;
use lang::PythonParser;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Source roots to analyze
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Exclude components whose path matches any of these globs
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,
    /// Exclude package marker files (__init__.py)
    #[arg(long)]
    pub no_packages: bool,
    /// Only report components whose name matches any of these globs
    #[arg(long, value_delimiter = ',')]
    pub filter: Vec<String>,
    /// Ignore import targets matching these globs (e.g. `tests.*`)
    #[arg(long, value_delimiter = ',')]
    pub ignore_deps: Vec<String>,
    /// Import search root (overrides BASEL_ROOT)
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Output format (basic, html, json, mean_i, mean_a, mean_e, mean, uml, img)
    #[arg(short, long, default_value = "basic")]
    pub format: ReportFormat,
}

pub async fn run_report(args: AnalyzeArgs, config: Config) -> anyhow::Result<()> {
    args.format.ensure_supports(ReportKind::Metrics)?;

    let config = config.with_root(args.root.clone());
    let (mut loader, filter) = prepare(&args, &config)?;

    let report = Report::Metrics(Reporter::new(&mut loader).get_as_report(&filter));
    emit(&report, args.format, &config).await
}

pub async fn run_rel(args: AnalyzeArgs, config: Config) -> anyhow::Result<()> {
    args.format.ensure_supports(ReportKind::Links)?;

    let config = config.with_root(args.root.clone());
    let (mut loader, filter) = prepare(&args, &config)?;
    loader.load_links();

    let report = Report::Links(Reporter::new(&mut loader).get_component_links_report(&filter));
    emit(&report, args.format, &config).await
}

fn prepare(args: &AnalyzeArgs, config: &Config) -> anyhow::Result<(Loader<PythonParser>, Filter)> {
    let filter = Filter::name_matches_any(&args.filter)?;

    let mut loader = Loader::new(PythonParser::new(config.root.clone()));
    loader.ignore_dependencies(&args.ignore_deps)?;
    loader
        .load_components(&args.paths, &args.exclude, args.no_packages)
        .context("Failed to discover components")?;

    Ok((loader, filter))
}

async fn emit(report: &Report, format: ReportFormat, config: &Config) -> anyhow::Result<()> {
    match format_report(report, format)? {
        FormattedReport::Scalar(value) => println!("{}", value),
        FormattedReport::Table(report) => match format {
            ReportFormat::Html => {
                let html = views::render_html(report);
                FileExporter.export(&Pack::new(&config.html_report, html.into_bytes()))?;
                println!("{}", views::render_table(report));
            }
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
            _ => println!("{}", views::render_table(report)),
        },
        FormattedReport::Uml(uml) if format == ReportFormat::Img => {
            let renderer = PlantUmlServer::new(&config.plantuml_server)?;
            let image = renderer
                .render(&uml)
                .await
                .context("Failed to render diagram")?;
            FileExporter.export(&Pack::new(&config.img_report, image))?;
            println!("Diagram written to {}", config.img_report.display());
        }
        FormattedReport::Uml(uml) => println!("{}", uml),
    }

    Ok(())
}
