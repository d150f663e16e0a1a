#![warn(missing_docs)]

//! batchwire-protocol: the batch-frame codec.
//!
//! Turns an ordered list of opaque sub-packets into a single transmittable
//! frame (optionally compressed and encrypted) and reverses the
//! transformation on receipt. Packet contents are never interpreted here;
//! the transport is supplied by the caller through the abstractions in
//! `batchwire-core`.

/// Frame encoding and decoding.
pub mod frame_codec;
/// Variable-length unsigned integer wire primitive.
pub mod varint;

pub use frame_codec::{
    CompressionMethod, CompressionRegistry, Decoder, Encoder, EncryptSession,
};
