//! Frame decoding.
//!
//! Reads raw frames from a transport, undoes encryption and compression,
//! and splits the result back into the original ordered sub-packets. Every
//! error here is fatal: framing and cipher state cannot be resynchronized,
//! so the caller is expected to close the connection.

use std::io::Cursor;
use std::sync::Arc;

use batchwire_core::config::CodecConfig;
use batchwire_core::constants::{
    FRAME_COMPRESSION_NONE, FRAME_HEADER, FRAME_TAG_SIZE, MAX_BATCH_PACKETS, MAX_RETAINED_BUFFER,
};
use batchwire_core::error::{CodecError, Result};
use batchwire_core::transport::FrameSource;

use super::compression::{CompressionMethod, CompressionRegistry};
use super::encrypt::EncryptSession;
use crate::varint;

/// How a decoder undoes payload compression.
enum Decompression {
    /// Dispatch on the frame's leading algorithm tag byte.
    Tagged(Arc<CompressionRegistry>),
    /// Pre-negotiation wire format: one fixed algorithm, no tag byte.
    Fixed(CompressionMethod),
}

/// Decodes frames read from a transport back into ordered sub-packets.
///
/// One decoder is bound to one connection direction and must be driven by
/// one logical caller at a time. `decode` blocks on the transport's read;
/// timeouts and cancellation are composed externally.
pub struct Decoder<S> {
    source: S,
    scratch: Vec<u8>,
    body: Vec<u8>,
    compression: Option<Decompression>,
    encryption: Option<EncryptSession>,
    verify_batch_limit: bool,
    max_decompressed_size: usize,
}

impl<S: FrameSource> Decoder<S> {
    /// Creates a decoder with the default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, &CodecConfig::default())
    }

    /// Creates a decoder tuned by `config`.
    pub fn with_config(source: S, config: &CodecConfig) -> Self {
        Self {
            source,
            scratch: vec![0u8; config.scratch_buffer_size],
            body: Vec::new(),
            compression: None,
            encryption: None,
            verify_batch_limit: config.verify_batch_limit,
            max_decompressed_size: config.max_decompressed_size,
        }
    }

    /// Enables tagged decompression: each frame names its algorithm in a
    /// leading tag byte, resolved through `registry`.
    pub fn enable_compression(&mut self, registry: Arc<CompressionRegistry>) {
        tracing::debug!("decoder compression enabled (tagged)");
        self.compression = Some(Decompression::Tagged(registry));
    }

    /// Enables legacy fixed-method decompression with no per-frame tag.
    pub fn enable_fixed_compression(&mut self, method: CompressionMethod) {
        tracing::debug!(id = method.id(), "decoder compression enabled (fixed)");
        self.compression = Some(Decompression::Fixed(method));
    }

    /// Enables decryption and verification with `session`.
    pub fn enable_encryption(&mut self, session: EncryptSession) {
        tracing::debug!("decoder encryption enabled");
        self.encryption = Some(session);
    }

    /// Disables the per-frame sub-packet count ceiling.
    ///
    /// Only the side that must accept intentionally large server-authored
    /// batches should do this.
    pub fn disable_batch_limit(&mut self) {
        self.verify_batch_limit = false;
    }

    /// Reads and decodes one frame, returning its sub-packets in order.
    pub fn decode(&mut self) -> Result<Vec<Vec<u8>>> {
        let n = self.source.read_frame(&mut self.scratch)?;
        if n == 0 {
            return Err(CodecError::EmptyFrame);
        }
        let frame = &mut self.scratch[..n];
        if frame[0] != FRAME_HEADER {
            return Err(CodecError::InvalidHeader { found: frame[0] });
        }

        let mut payload_len = frame.len() - 1;
        if let Some(session) = self.encryption.as_mut() {
            let payload = &mut frame[1..];
            session.decrypt(payload);
            session.verify(payload)?;
            payload_len -= FRAME_TAG_SIZE;
        }
        let payload = &frame[1..1 + payload_len];

        self.body.clear();
        match &self.compression {
            None => self.body.extend_from_slice(payload),
            Some(Decompression::Tagged(registry)) => {
                let (&tag, compressed) =
                    payload.split_first().ok_or(CodecError::TruncatedLength)?;
                if tag == FRAME_COMPRESSION_NONE {
                    self.body.extend_from_slice(compressed);
                } else {
                    let (method, known) = registry.lookup(u16::from(tag));
                    if !known {
                        return Err(CodecError::UnknownCompression { id: u16::from(tag) });
                    }
                    method.decompress_into(compressed, self.max_decompressed_size, &mut self.body)?;
                }
            }
            Some(Decompression::Fixed(method)) => {
                method.decompress_into(payload, self.max_decompressed_size, &mut self.body)?;
            }
        }

        let packets = self.split_body()?;

        // Bound steady-state memory: oversized body buffers are not retained.
        if self.body.capacity() > MAX_RETAINED_BUFFER {
            self.body = Vec::new();
        }

        Ok(packets)
    }

    /// Splits the body into its length-prefixed sub-packets.
    fn split_body(&self) -> Result<Vec<Vec<u8>>> {
        let body = self.body.as_slice();
        let mut cursor = Cursor::new(body);
        let mut packets = Vec::new();

        while (cursor.position() as usize) < body.len() {
            let length =
                varint::read_varuint32(&mut cursor).map_err(|_| CodecError::TruncatedLength)?
                    as usize;
            let start = cursor.position() as usize;
            let remaining = body.len() - start;
            if length > remaining {
                return Err(CodecError::PacketLengthOverrun { length, remaining });
            }
            if self.verify_batch_limit && packets.len() == MAX_BATCH_PACKETS {
                tracing::warn!(limit = MAX_BATCH_PACKETS, "frame exceeds the batch packet ceiling");
                return Err(CodecError::BatchTooLarge {
                    count: packets.len() + 1,
                    limit: MAX_BATCH_PACKETS,
                });
            }
            packets.push(body[start..start + length].to_vec());
            cursor.set_position((start + length) as u64);
        }

        Ok(packets)
    }
}
