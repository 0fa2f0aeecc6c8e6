use std::hash::Hasher;

use crate::state::StartupState;

/// A deterministic FNV-1a 64-bit hasher.
///
/// Digests must match across processes and platforms, which rules out the
/// randomly keyed `DefaultHasher`.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Digest of the persisted form of `state`; equal states digest equally.
pub fn state_digest(state: &StartupState) -> Result<u64, bincode::Error> {
    let bytes = bincode::serialize(&state.to_record())?;
    let mut hasher = FnvHasher::new();
    hasher.write(&bytes);
    Ok(hasher.finish())
}
