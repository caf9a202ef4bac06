//! Prompt driver
//!
//! Feeds prompts to the studio one cycle at a time. Prompts come from the
//! command line, then from an input source line by line. While a cycle runs
//! its cancel handle is published so the Ctrl-C task can reach it.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{info, warn};

use appstudio_core::backend::GenerationBackend;
use appstudio_core::{CancelHandle, Status, Studio, StudioError};

/// Ends the interactive loop
const QUIT: &str = ":quit";
/// Discards the app; the next line starts a new one
const NEW: &str = ":new";

/// Feeds prompts to the studio, one cycle at a time
pub struct Driver<'a, B: GenerationBackend> {
    studio: &'a mut Studio<B>,
    /// Holds the cancel handle while a cycle runs
    armed: watch::Sender<Option<CancelHandle>>,
    model: String,
    framework: String,
}

impl<'a, B: GenerationBackend> Driver<'a, B> {
    /// Driver creating apps with `model` and `framework`
    pub fn new(
        studio: &'a mut Studio<B>,
        armed: watch::Sender<Option<CancelHandle>>,
        model: String,
        framework: String,
    ) -> Self {
        Self {
            studio,
            armed,
            model,
            framework,
        }
    }

    /// Run until input ends or `:quit`
    ///
    /// With `revisions`, the creation and each revision run in order and the
    /// first failure is returned; `input` is only read for a missing prompt.
    /// Otherwise failures are reported by the renderer and the loop goes on.
    pub async fn drive<R>(
        &mut self,
        prompt: Option<&str>,
        revisions: &[String],
        input: R,
    ) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        let prompt = match prompt {
            Some(prompt) => prompt.to_string(),
            None => {
                eprintln!("Describe the app to build:");
                match lines.next_line().await? {
                    Some(line) => line,
                    None => return Ok(()),
                }
            }
        };

        if !revisions.is_empty() {
            self.create(&prompt).await?;
            for revision in revisions {
                self.revise(revision).await?;
            }
            return Ok(());
        }

        report(self.create(&prompt).await);
        loop {
            if self.studio.status() == Status::Initial {
                eprintln!("Describe the app to build ({QUIT} to exit):");
            } else {
                eprintln!("What should change? ({NEW} to start over, {QUIT} to exit)");
            }

            let Some(line) = lines.next_line().await? else {
                break;
            };
            match line.trim() {
                "" => {}
                QUIT => break,
                NEW => self.studio.reset().await,
                line if self.studio.status() == Status::Initial => {
                    report(self.create(line).await);
                }
                line => report(self.revise(line).await),
            }
        }
        Ok(())
    }

    async fn create(&mut self, prompt: &str) -> Result<(), StudioError> {
        self.arm();
        let result = self
            .studio
            .start_creation(prompt, self.model.clone(), self.framework.clone())
            .await;
        self.disarm();
        result.map(|summary| {
            info!(
                bytes = summary.artifact_len,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "App created"
            );
        })
    }

    async fn revise(&mut self, prompt: &str) -> Result<(), StudioError> {
        self.arm();
        let result = self.studio.start_revision(prompt).await;
        self.disarm();
        result.map(|summary| {
            info!(
                bytes = summary.artifact_len,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "App updated"
            );
        })
    }

    fn arm(&self) {
        self.armed.send_replace(Some(self.studio.cancel_handle()));
    }

    fn disarm(&self) {
        self.armed.send_replace(None);
    }
}

/// Log a cycle that did not complete; the renderer has already shown it
fn report(result: Result<(), StudioError>) {
    if let Err(e) = result {
        warn!(error = %e, recoverable = e.is_recoverable(), "Cycle did not complete");
    }
}
