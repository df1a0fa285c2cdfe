use crate::{Result, Seed, derive};
use serde::{Deserialize, Serialize};

fn default_extension() -> String {
    ".mp4".to_owned()
}

/// Everything needed to reverse a selective encryption run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Slice QPs in decoding order, aligned with the slice units of the stream.
    pub qps: Vec<i32>,
    pub qp_threshold: i32,
    /// Container extension of the source file, including the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub audio_included: bool,
    /// Slice indices transformed at encryption time. Absent in metadata
    /// written by older tools, in which case the threshold policy is replayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<Vec<usize>>,
}

impl Metadata {
    pub fn new(qps: Vec<i32>, qp_threshold: i32) -> Self {
        Self {
            qps,
            qp_threshold,
            extension: default_extension(),
            audio_included: false,
            selected: None,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Json document encrypted under the reserved metadata index.
    pub fn encrypt(&self, seed: &Seed) -> Result<Vec<u8>> {
        Ok(derive::apply(seed, derive::METADATA_INDEX, &self.to_json()?))
    }

    pub fn decrypt(data: &[u8], seed: &Seed) -> Result<Self> {
        Self::from_json(&derive::apply(seed, derive::METADATA_INDEX, data))
    }
}
