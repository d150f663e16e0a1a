#![warn(missing_docs)]

//! batchwire-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core utilities shared across all layers:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//! - Memory utilities (object pooling)
//! - Transport abstraction
//!
//! The codec itself lives in `batchwire-protocol`.

/// Protocol constants shared across layers.
pub mod constants {
    /// The fixed first byte of every frame on the wire.
    pub const FRAME_HEADER: u8 = 0xFE;
    /// Frame compression tag meaning "this payload is not compressed".
    pub const FRAME_COMPRESSION_NONE: u8 = 0xFF;
    /// Size in bytes of the truncated SHA-256 tag trailing an encrypted payload.
    pub const FRAME_TAG_SIZE: usize = 8;
    /// Maximum number of sub-packets a single frame may carry.
    ///
    /// Bounds per-frame CPU and memory work. Only the side that must accept
    /// intentionally large server-authored batches disables this.
    pub const MAX_BATCH_PACKETS: usize = 812;
    /// Default scratch buffer size for reading frames from byte-stream transports.
    pub const DEFAULT_SCRATCH_SIZE: usize = 1024 * 1024 * 3;
    /// Default cap on the decompressed size of a single frame payload.
    pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 1024 * 1024 * 64;
    /// Reusable codec buffers larger than this are dropped instead of retained,
    /// bounding steady-state memory per connection.
    pub const MAX_RETAINED_BUFFER: usize = 1024 * 1024;
}

/// Configuration options to tune codec behavior.
pub mod config;
/// Error types and results.
pub mod error;
/// Object pooling for expensive-to-allocate codec state.
pub mod pool;
/// Transport abstraction for pluggable I/O.
pub mod transport;
