#![warn(missing_docs)]

//! Batchwire: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports
//! the most commonly used types for batch-frame transports:
//!
//! - Codec endpoints (`Encoder`, `Decoder`)
//! - Compression (`CompressionMethod`, `CompressionRegistry`)
//! - Encryption (`EncryptSession`)
//! - Core configuration and errors (`CodecConfig`, `CodecError`)
//! - Transport abstraction (`FrameSource`, `FrameSink`)
//!
//! Example
//! ```ignore
//! use std::sync::Arc;
//! use batchwire::{CompressionMethod, CompressionRegistry, Decoder, Encoder};
//!
//! let registry = Arc::new(CompressionRegistry::standard());
//!
//! // One encoder per outgoing direction, one decoder per incoming one.
//! let mut encoder = Encoder::new(sink);
//! encoder.enable_compression(CompressionMethod::Deflate)?;
//!
//! let mut decoder = Decoder::new(source);
//! decoder.enable_compression(registry);
//!
//! encoder.encode(&[b"position update".to_vec(), b"chat line".to_vec()])?;
//! let packets = decoder.decode()?;
//! ```

// Core configuration and errors
pub use batchwire_core::config::CodecConfig;
pub use batchwire_core::error::{CodecError, Result};
// Transport abstraction
pub use batchwire_core::transport::{FrameSink, FrameSource, ReadSource, WriteSink};
// Codec: endpoints, compression, encryption
pub use batchwire_protocol::frame_codec::{
    CompressionMethod, CompressionRegistry, Decoder, Encoder, EncryptSession,
};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        CodecConfig, CodecError, CompressionMethod, CompressionRegistry, Decoder, Encoder,
        EncryptSession, FrameSink, FrameSource,
    };
}
