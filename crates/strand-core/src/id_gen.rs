//! Generation of sibling-unique ids

use crate::address::{Id, MAX_ID_LEN};
use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::rng::XorShift;

/// Produces fixed-width random ids that are unused among some siblings
#[derive(Debug, Clone)]
pub struct IdGenerator {
    width: usize,
    max_attempts: usize,
    rng: XorShift,
}

impl IdGenerator {
    /// `width` is clamped to `[1, MAX_ID_LEN]`
    pub fn new(width: usize, seed: u64) -> Self {
        Self {
            width: width.clamp(1, MAX_ID_LEN),
            max_attempts: 64,
            rng: XorShift::new(seed),
        }
    }

    pub fn from_config(config: &GraphConfig) -> Self {
        let mut generator = Self::new(config.id_width, config.id_seed);
        generator.max_attempts = config.max_id_attempts.max(1);
        generator
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Next random id, without any uniqueness check
    pub fn next_id(&mut self) -> Id {
        let mut bytes = [0u8; MAX_ID_LEN];
        self.rng.fill_bytes(&mut bytes[..self.width]);
        Id::from_bytes(&bytes[..self.width]).unwrap_or(Id::INVALID)
    }

    /// Next id for which `is_used` returns false
    pub fn next_unused(&mut self, mut is_used: impl FnMut(&Id) -> bool) -> Result<Id> {
        for _ in 0..self.max_attempts {
            let id = self.next_id();
            if id.is_valid() && !is_used(&id) {
                return Ok(id);
            }
        }
        Err(Error::IdSpaceExhausted(self.max_attempts))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::from_config(&GraphConfig::default())
    }
}
