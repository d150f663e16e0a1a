//! Error types for the frame codec.
//!
//! Every error in this layer is fatal to the connection: cipher and framing
//! state cannot be resynchronized after a corrupted or misordered frame, so
//! callers are expected to close the transport on any error.

use std::io;

use thiserror::Error;

/// The primary error type for all codec operations.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Propagated unchanged from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transport produced a zero-length frame.
    #[error("empty frame")]
    EmptyFrame,

    /// The first byte of the frame was not the fixed header value.
    #[error("invalid frame header: expected 0xfe, found {found:#04x}")]
    InvalidHeader {
        /// The byte found in place of the header.
        found: u8,
    },

    /// A sub-packet length prefix was cut off by the end of the body.
    #[error("truncated length prefix in batch body")]
    TruncatedLength,

    /// A sub-packet length prefix pointed past the end of the body.
    #[error("sub-packet length {length} exceeds {remaining} remaining bytes")]
    PacketLengthOverrun {
        /// The length the prefix claimed.
        length: usize,
        /// The bytes actually remaining in the body.
        remaining: usize,
    },

    /// A frame carried more sub-packets than the configured ceiling.
    #[error("batch of {count} packets exceeds limit of {limit}")]
    BatchTooLarge {
        /// Number of sub-packets in the frame.
        count: usize,
        /// The configured ceiling.
        limit: usize,
    },

    /// A frame named a compression algorithm the registry does not know.
    #[error("unknown compression algorithm {id}")]
    UnknownCompression {
        /// The identifier read from the frame.
        id: u16,
    },

    /// The true decompressed size of a payload exceeds the configured limit.
    #[error("decompressed size exceeds limit of {limit} bytes")]
    DecompressedTooLarge {
        /// The limit that was exceeded.
        limit: usize,
    },

    /// The compressed stream is malformed.
    #[error("corrupt compressed data")]
    CorruptCompressedData,

    /// Compressing a frame body failed.
    #[error("compression failed")]
    CompressionFailure,

    /// The compression method is not representable in a one-byte frame tag.
    #[error("compression id {id} does not fit in a frame tag byte")]
    UntaggableCompression {
        /// The out-of-range identifier.
        id: u16,
    },

    /// A decrypted payload was shorter than the trailing authentication tag.
    #[error("encrypted payload of {length} bytes is shorter than its tag")]
    PayloadTooShort {
        /// The decrypted payload length.
        length: usize,
    },

    /// The recomputed frame tag did not match the received tag.
    #[error("frame authentication tag mismatch")]
    TagMismatch,
}

/// Type alias for results using [`CodecError`].
pub type Result<T> = std::result::Result<T, CodecError>;
