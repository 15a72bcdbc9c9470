//! Report exporters and PlantUML image rendering

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Renderer error: {0}")]
    Renderer(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Named content to export
#[derive(Debug, Clone)]
pub struct Pack {
    pub name: PathBuf,
    pub content: Vec<u8>,
}

impl Pack {
    pub fn new(name: &Path, content: Vec<u8>) -> Self {
        Self {
            name: name.to_path_buf(),
            content,
        }
    }
}

pub trait Exporter {
    fn export(&self, pack: &Pack) -> Result<()>;
}

/// Writes packs to the file system, overwriting existing files
pub struct FileExporter;

impl Exporter for FileExporter {
    fn export(&self, pack: &Pack) -> Result<()> {
        std::fs::write(&pack.name, &pack.content)?;
        tracing::info!("Wrote {} bytes to {}", pack.content.len(), pack.name.display());
        Ok(())
    }
}

/// UML text -> image bytes
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, uml: &str) -> Result<Vec<u8>>;
}

/// PlantUML server renderer (`GET {server}/png/~h{hex}`)
pub struct PlantUmlServer {
    client: Client,
    base_url: String,
}

impl PlantUmlServer {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn png_url(&self, uml: &str) -> String {
        format!("{}/png/~h{}", self.base_url, hex::encode(uml))
    }
}

#[async_trait]
impl DiagramRenderer for PlantUmlServer {
    async fn render(&self, uml: &str) -> Result<Vec<u8>> {
        let url = self.png_url(uml);
        tracing::debug!("Rendering diagram via {}", self.base_url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ExportError::Renderer(format!(
                "PlantUML server returned status {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
