//! Frame encoding.
//!
//! Merges an ordered list of sub-packets into one length-prefixed body,
//! compresses it, optionally encrypts it, and hands the finished frame to
//! the transport with exactly one write.

use batchwire_core::constants::{FRAME_COMPRESSION_NONE, FRAME_HEADER, MAX_RETAINED_BUFFER};
use batchwire_core::error::{CodecError, Result};
use batchwire_core::transport::FrameSink;

use super::compression::CompressionMethod;
use super::encrypt::EncryptSession;
use crate::varint;

/// How an encoder compresses frame payloads.
enum Compression {
    /// Write the algorithm's tag byte, then the compressed body.
    Tagged(CompressionMethod),
    /// Pre-negotiation wire format: fixed algorithm, no tag byte.
    Fixed(CompressionMethod),
}

/// Merges ordered sub-packets into single frames written to a transport.
///
/// One encoder is bound to one connection direction and must be driven by
/// one logical caller at a time. `encode` blocks on the transport's write.
pub struct Encoder<S> {
    sink: S,
    frame: Vec<u8>,
    body: Vec<u8>,
    compression: Option<Compression>,
    encryption: Option<EncryptSession>,
}

impl<S: FrameSink> Encoder<S> {
    /// Creates an encoder writing frames to `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            frame: Vec::new(),
            body: Vec::new(),
            compression: None,
            encryption: None,
        }
    }

    /// Enables tagged compression with `method`: each frame carries a
    /// leading algorithm tag byte for the peer to dispatch on.
    ///
    /// Fails if the method's identifier does not fit in the tag byte.
    pub fn enable_compression(&mut self, method: CompressionMethod) -> Result<()> {
        if method != CompressionMethod::None && method.id() > 0xFE {
            return Err(CodecError::UntaggableCompression { id: method.id() });
        }
        tracing::debug!(id = method.id(), "encoder compression enabled (tagged)");
        self.compression = Some(Compression::Tagged(method));
        Ok(())
    }

    /// Enables legacy fixed-method compression with no per-frame tag.
    pub fn enable_fixed_compression(&mut self, method: CompressionMethod) {
        tracing::debug!(id = method.id(), "encoder compression enabled (fixed)");
        self.compression = Some(Compression::Fixed(method));
    }

    /// Enables encryption with `session`.
    pub fn enable_encryption(&mut self, session: EncryptSession) {
        tracing::debug!("encoder encryption enabled");
        self.encryption = Some(session);
    }

    /// Encodes `packets` into one frame and writes it to the transport
    /// with a single write, preserving packet order.
    pub fn encode<P: AsRef<[u8]>>(&mut self, packets: &[P]) -> Result<()> {
        self.frame.clear();
        self.body.clear();
        self.frame.push(FRAME_HEADER);

        for packet in packets {
            let packet = packet.as_ref();
            varint::write_varuint32(&mut self.body, packet.len() as u32)?;
            self.body.extend_from_slice(packet);
        }

        match &self.compression {
            None => self.frame.extend_from_slice(&self.body),
            Some(Compression::Tagged(method)) => {
                if *method == CompressionMethod::None {
                    self.frame.push(FRAME_COMPRESSION_NONE);
                    self.frame.extend_from_slice(&self.body);
                } else {
                    self.frame.push(method.id() as u8);
                    method.compress_into(&self.body, &mut self.frame)?;
                }
            }
            Some(Compression::Fixed(method)) => {
                method.compress_into(&self.body, &mut self.frame)?;
            }
        }

        if let Some(session) = self.encryption.as_mut() {
            // The tag covers everything after the header byte.
            session.encrypt_from(&mut self.frame, 1);
        }

        self.sink.write_frame(&self.frame)?;

        // Bound steady-state memory: oversized buffers are not retained.
        if self.frame.capacity() > MAX_RETAINED_BUFFER {
            self.frame = Vec::new();
        }
        if self.body.capacity() > MAX_RETAINED_BUFFER {
            self.body = Vec::new();
        }
        Ok(())
    }
}
