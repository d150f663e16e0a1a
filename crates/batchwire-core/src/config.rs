use crate::constants::{DEFAULT_MAX_DECOMPRESSED_SIZE, DEFAULT_SCRATCH_SIZE};

#[derive(Clone, Debug)]
/// Configuration options to tune codec behavior.
pub struct CodecConfig {
    /// Size of the scratch buffer a decoder reads frames into.
    ///
    /// This caps the size of a single frame for byte-stream transports.
    pub scratch_buffer_size: usize,
    /// Max decompressed size of a single frame payload in bytes.
    /// Prevents memory exhaustion from decompression bombs.
    pub max_decompressed_size: usize,
    /// Enforce the per-frame sub-packet count ceiling (default: true).
    /// Disable only on the side that must accept intentionally large
    /// server-authored batches.
    pub verify_batch_limit: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            scratch_buffer_size: DEFAULT_SCRATCH_SIZE,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            verify_batch_limit: true,
        }
    }
}
