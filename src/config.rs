//! Runtime configuration

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Import search root
    pub root: PathBuf,
    pub html_report: PathBuf,
    pub img_report: PathBuf,
    pub plantuml_server: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            html_report: PathBuf::from("basel_report.html"),
            img_report: PathBuf::from("basel_report.png"),
            plantuml_server: "http://www.plantuml.com/plantuml".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `BASEL_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("BASEL_ROOT") {
            config.root = PathBuf::from(v);
        }

        if let Ok(v) = std::env::var("BASEL_HTML_REPORT") {
            config.html_report = PathBuf::from(v);
        }

        if let Ok(v) = std::env::var("BASEL_IMG_REPORT") {
            config.img_report = PathBuf::from(v);
        }

        if let Ok(v) = std::env::var("BASEL_PLANTUML_SERVER") {
            config.plantuml_server = v.trim_end_matches('/').to_string();
        }

        config
    }

    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        if let Some(root) = root {
            self.root = root;
        }
        self
    }
}
