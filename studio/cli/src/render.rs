//! Terminal renderer
//!
//! Consumes [`StudioMessage`]s. With an output directory every artifact
//! update is written to disk so a dev server can hot-reload it; without one
//! the finished artifact is printed to stdout. Status lines and failures go
//! to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use appstudio_core::{NotifyLevel, Status, StudioMessage};

use crate::catalog::artifact_path;

/// Where artifacts go
#[derive(Debug)]
pub struct Renderer {
    /// Artifact file, when writing to disk
    target: Option<PathBuf>,
    /// Most recent artifact content
    latest: String,
    /// Content last written to `target`
    written: Option<String>,
    /// A failure was reported since the last status change
    failed: bool,
}

impl Renderer {
    /// Renderer for `framework`, writing under `out_dir` if given
    pub fn new(out_dir: Option<&Path>, framework: &str) -> Self {
        Self {
            target: out_dir.map(|dir| dir.join(artifact_path(framework))),
            latest: String::new(),
            written: None,
            failed: false,
        }
    }

    /// Artifact file, when writing to disk
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// Render messages until the channel closes
    pub async fn run(mut self, mut rx: mpsc::Receiver<StudioMessage>) {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = self.handle(msg).await {
                tracing::warn!(error = %e, "Failed to render artifact");
                eprintln!("✗ {e:#}");
            }
        }
    }

    /// Render one message
    pub async fn handle(&mut self, msg: StudioMessage) -> anyhow::Result<()> {
        match msg {
            StudioMessage::Artifact { content, .. } => {
                self.latest = content;
                self.write_artifact().await?;
            }
            StudioMessage::StatusChanged { status } => {
                let failed = std::mem::take(&mut self.failed);
                eprintln!("» {}", status.description());
                if status.is_idle_with_artifact() && !failed {
                    self.announce(status).await?;
                }
            }
            StudioMessage::Failed { error, status } => {
                self.failed = true;
                eprintln!("✗ {error} (back to: {status})");
            }
            StudioMessage::Notice { level, text } => {
                let marker = match level {
                    NotifyLevel::Info => "·",
                    NotifyLevel::Warning => "!",
                    NotifyLevel::Error => "✗",
                };
                eprintln!("{marker} {text}");
            }
        }
        Ok(())
    }

    async fn write_artifact(&mut self) -> anyhow::Result<()> {
        let Some(ref target) = self.target else {
            return Ok(());
        };
        if self.written.as_deref() == Some(self.latest.as_str()) {
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(target, self.latest.as_bytes())
            .await
            .with_context(|| format!("writing {}", target.display()))?;

        self.written = Some(self.latest.clone());
        tracing::debug!(path = %target.display(), bytes = self.latest.len(), "Artifact written");
        Ok(())
    }

    async fn announce(&self, status: Status) -> anyhow::Result<()> {
        match self.target {
            Some(ref target) => {
                eprintln!("  {} ({} bytes, {status})", target.display(), self.latest.len());
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(self.latest.as_bytes()).await?;
                if !self.latest.ends_with('\n') {
                    stdout.write_all(b"\n").await?;
                }
                stdout.flush().await?;
            }
        }
        Ok(())
    }
}
