//! Stateless one-shot prompt execution.
//!
//! A run builds a [`Transcript`] from the edited blocks, normalizes the
//! sampling values and sends both to the playground endpoint. Nothing is
//! recorded in any chat session.

pub mod sampling;
pub mod transcript;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;

use crate::dispatch::models::{PlaygroundOptions, PlaygroundRequest, PlaygroundResponse, TurnPayload};
use crate::dispatch::{Dispatch, Endpoint, encode, fetch};
use crate::error::ConsoleResult;

pub use sampling::{SamplingInput, SamplingParameters};
pub use transcript::{PromptBlock, Transcript};

pub struct Playground {
    dispatcher: Arc<dyn Dispatch>,
}

impl Playground {
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { dispatcher }
    }

    /// Validates the blocks and sampling values, then executes. Fails with
    /// `EmptyTranscript` before any dispatch when there is nothing to send.
    pub async fn run(&self, blocks: &[PromptBlock], sampling: &SamplingInput) -> ConsoleResult<String> {
        let transcript = Transcript::build(blocks)?;
        let params = SamplingParameters::normalize(sampling);
        self.execute(&transcript, params).await
    }

    pub async fn execute(
        &self,
        transcript: &Transcript,
        params: SamplingParameters,
    ) -> ConsoleResult<String> {
        let request = PlaygroundRequest {
            messages: transcript
                .blocks()
                .iter()
                .map(|block| TurnPayload {
                    role: block.role,
                    content: &block.content,
                })
                .collect(),
            options: PlaygroundOptions {
                temperature: params.temperature,
                num_predict: params.max_output_tokens,
                top_p: params.top_p,
            },
        };
        let payload = encode(&request)?;
        debug!(
            "Running playground with {} blocks, {:?}",
            transcript.len(),
            params
        );

        let response: PlaygroundResponse =
            fetch(&*self.dispatcher, Endpoint::playground(), Some(payload)).await?;
        info!("Playground produced {} characters", response.reply.len());
        Ok(response.reply)
    }
}

#[derive(Debug, Deserialize)]
struct PromptFile {
    #[serde(default)]
    blocks: Vec<PromptBlock>,
}

/// Reads prompt blocks from a TOML file made of `[[blocks]]` tables with
/// `role` and `content` keys.
pub fn load_blocks(path: &Path) -> Result<Vec<PromptBlock>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read prompt file: {}", path.display()))?;
    let file: PromptFile = toml::from_str(&raw)
        .with_context(|| format!("failed to parse prompt file: {}", path.display()))?;
    Ok(file.blocks)
}
