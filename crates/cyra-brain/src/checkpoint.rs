//! Binary checkpoints holding an actor/critic parameter pair.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::network::Mlp;
use crate::policy::PolicyError;

/// Bumped whenever the encoded layout changes.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Serialized actor and critic parameters.
///
/// Encoded with postcard, which stores `f32` values as raw little-endian bits
/// so a save/load cycle reproduces every parameter exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub version: u32,
    pub actor: Mlp,
    pub critic: Mlp,
}

impl Checkpoint {
    pub fn encode(&self) -> Result<Vec<u8>, PolicyError> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Decode and reject networks whose tensors disagree with their declared shapes.
    pub fn decode(bytes: &[u8]) -> Result<Self, PolicyError> {
        let checkpoint: Self = postcard::from_bytes(bytes)?;
        checkpoint.actor.validate()?;
        checkpoint.critic.validate()?;
        Ok(checkpoint)
    }

    /// Write atomically: encode to a sibling temp file, then rename over `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PolicyError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.encode()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes)
    }
}
