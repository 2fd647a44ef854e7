use serde::{Deserialize, Serialize};

use crate::chat::Role;
use crate::error::{ConsoleError, ConsoleResult};

/// One editable block of the playground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBlock {
    pub role: Role,
    pub content: String,
}

impl PromptBlock {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered, non-empty sequence of role-tagged blocks ready to be sent as
/// one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    blocks: Vec<PromptBlock>,
}

impl Transcript {
    /// Keeps the blocks with non-blank content, trimmed, in declaration
    /// order. Roles are carried through untouched and nothing is injected.
    pub fn build(blocks: &[PromptBlock]) -> ConsoleResult<Self> {
        let blocks: Vec<PromptBlock> = blocks
            .iter()
            .filter_map(|block| {
                let content = block.content.trim();
                (!content.is_empty()).then(|| PromptBlock::new(block.role, content))
            })
            .collect();

        if blocks.is_empty() {
            return Err(ConsoleError::EmptyTranscript);
        }
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[PromptBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
