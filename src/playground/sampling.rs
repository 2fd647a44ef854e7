use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Sampling values as the user typed them: any field may be missing or out
/// of range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingInput {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<i64>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl SamplingInput {
    /// Fills the fields missing here from `fallback`.
    pub fn or(self, fallback: &SamplingInput) -> SamplingInput {
        SamplingInput {
            temperature: self.temperature.or(fallback.temperature),
            max_output_tokens: self.max_output_tokens.or(fallback.max_output_tokens),
            top_p: self.top_p.or(fallback.top_p),
        }
    }
}

/// Validated sampling parameters attached to a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParameters {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl SamplingParameters {
    /// Clamps every field into range and substitutes the default for any
    /// missing one. Never fails: bad input is corrected.
    pub fn normalize(input: &SamplingInput) -> Self {
        Self {
            temperature: unit_interval(input.temperature, DEFAULT_TEMPERATURE),
            max_output_tokens: input
                .max_output_tokens
                .map(|tokens| tokens.clamp(1, i64::from(u32::MAX)) as u32)
                .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            top_p: unit_interval(input.top_p, DEFAULT_TOP_P),
        }
    }
}

fn unit_interval(value: Option<f32>, default: f32) -> f32 {
    match value {
        Some(v) if v.is_nan() => default,
        Some(v) => v.clamp(0.0, 1.0),
        None => default,
    }
}
