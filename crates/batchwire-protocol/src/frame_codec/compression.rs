//! Frame payload compression and decompression.
//!
//! Three algorithms share one contract: a stable numeric identifier,
//! `compress`, and a size-limited `decompress` that fails rather than
//! expand past the caller's limit. The limit is a security invariant: a
//! peer must not be able to send a small frame that expands to gigabytes.

use std::collections::HashMap;

use batchwire_core::error::{CodecError, Result};
use batchwire_core::pool::ObjectPool;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

/// Growth step for decompression output buffers.
const OUT_CHUNK: usize = 16 * 1024;
/// Idle DEFLATE states retained per pool.
const MAX_IDLE_STATES: usize = 16;

// DEFLATE stream state is expensive to set up, so idle states are pooled
// process-wide and shared by every connection's encoder and decoder.
static DEFLATE_COMPRESSORS: ObjectPool<Compress> = ObjectPool::new(MAX_IDLE_STATES);
static DEFLATE_DECOMPRESSORS: ObjectPool<Decompress> = ObjectPool::new(MAX_IDLE_STATES);

/// Compression algorithm applied to frame bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    /// No compression; bytes pass through unchanged.
    None,
    /// Raw DEFLATE streams, each frame compressed from a clean dictionary.
    Deflate,
    /// Snappy block format, which carries its own decoded-length prefix.
    Snappy,
}

impl CompressionMethod {
    /// Stable numeric identifier used in negotiation and frame tags.
    ///
    /// The "none" sentinel sits outside the one-byte frame-tag range; on
    /// the wire it appears as the distinguished tag 0xFF instead.
    pub fn id(self) -> u16 {
        match self {
            CompressionMethod::Deflate => 0,
            CompressionMethod::Snappy => 1,
            CompressionMethod::None => 0xFFFF,
        }
    }

    /// Compresses `input`, returning the compressed bytes.
    pub fn compress(self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.compress_into(input, &mut output)?;
        Ok(output)
    }

    /// Compresses `input`, appending the compressed bytes to `out`.
    pub fn compress_into(self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            CompressionMethod::None => {
                out.extend_from_slice(input);
                Ok(())
            }
            CompressionMethod::Deflate => deflate_compress(input, out),
            CompressionMethod::Snappy => snappy_compress(input, out),
        }
    }

    /// Decompresses `input`, failing if the true decompressed size would
    /// exceed `limit` bytes. A limit of `usize::MAX` copies to completion.
    pub fn decompress(self, input: &[u8], limit: usize) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.decompress_into(input, limit, &mut output)?;
        Ok(output)
    }

    /// Decompresses `input`, appending to `out` and enforcing `limit`.
    pub fn decompress_into(self, input: &[u8], limit: usize, out: &mut Vec<u8>) -> Result<()> {
        match self {
            CompressionMethod::None => {
                if input.len() > limit {
                    return Err(CodecError::DecompressedTooLarge { limit });
                }
                out.extend_from_slice(input);
                Ok(())
            }
            CompressionMethod::Deflate => deflate_decompress(input, limit, out),
            CompressionMethod::Snappy => snappy_decompress(input, limit, out),
        }
    }
}

fn deflate_compress(input: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut state = DEFLATE_COMPRESSORS.checkout(|| Compress::new(Compression::default(), false));
    // Reset gives every frame a clean dictionary, keeping frames
    // independently decodable.
    state.reset();

    let result = deflate_compress_with(&mut state, input, out);
    DEFLATE_COMPRESSORS.restore(state);
    result
}

fn deflate_compress_with(state: &mut Compress, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
    loop {
        if out.len() == out.capacity() {
            out.reserve(OUT_CHUNK);
        }
        let consumed = state.total_in() as usize;
        let status = state
            .compress_vec(&input[consumed..], out, FlushCompress::Finish)
            .map_err(|_| CodecError::CompressionFailure)?;
        match status {
            Status::StreamEnd => return Ok(()),
            Status::Ok | Status::BufError => {}
        }
    }
}

fn deflate_decompress(input: &[u8], limit: usize, out: &mut Vec<u8>) -> Result<()> {
    let mut state = DEFLATE_DECOMPRESSORS.checkout(|| Decompress::new(false));
    state.reset(false);

    let result = deflate_decompress_with(&mut state, input, limit, out);
    DEFLATE_DECOMPRESSORS.restore(state);
    result
}

/// Inflates without trusting any embedded size field: output space grows at
/// most one byte past `limit`, which is enough to observe an overflow.
fn deflate_decompress_with(
    state: &mut Decompress,
    input: &[u8],
    limit: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    loop {
        if out.len() == out.capacity() {
            if out.len() > limit {
                return Err(CodecError::DecompressedTooLarge { limit });
            }
            let grow = if limit == usize::MAX {
                OUT_CHUNK
            } else {
                OUT_CHUNK.min(limit + 1 - out.len()).max(1)
            };
            out.reserve(grow);
        }
        let consumed = state.total_in() as usize;
        let produced = out.len();
        let status = state
            .decompress_vec(&input[consumed..], out, FlushDecompress::Finish)
            .map_err(|_| CodecError::CorruptCompressedData)?;
        if out.len() > limit {
            return Err(CodecError::DecompressedTooLarge { limit });
        }
        match status {
            Status::StreamEnd => return Ok(()),
            Status::Ok | Status::BufError => {
                // No forward progress while output space remains means the
                // stream is truncated or corrupt, not that we are full.
                if state.total_in() as usize == consumed
                    && out.len() == produced
                    && out.len() < out.capacity()
                {
                    return Err(CodecError::CorruptCompressedData);
                }
            }
        }
    }
}

fn snappy_compress(input: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let start = out.len();
    out.resize(start + snap::raw::max_compress_len(input.len()), 0);
    let written = snap::raw::Encoder::new()
        .compress(input, &mut out[start..])
        .map_err(|_| CodecError::CompressionFailure)?;
    out.truncate(start + written);
    Ok(())
}

fn snappy_decompress(input: &[u8], limit: usize, out: &mut Vec<u8>) -> Result<()> {
    // The block format prefixes its decoded length; oversized claims are
    // rejected before any decode work happens.
    let decoded_len =
        snap::raw::decompress_len(input).map_err(|_| CodecError::CorruptCompressedData)?;
    if decoded_len > limit {
        return Err(CodecError::DecompressedTooLarge { limit });
    }
    let start = out.len();
    out.resize(start + decoded_len, 0);
    let written = snap::raw::Decoder::new()
        .decompress(input, &mut out[start..])
        .map_err(|_| CodecError::CorruptCompressedData)?;
    out.truncate(start + written);
    Ok(())
}

/// Process-wide mapping from numeric identifiers to compression methods.
///
/// Constructed once at startup and shared by reference with every decoder
/// configuration; never mutated per connection.
#[derive(Clone, Debug)]
pub struct CompressionRegistry {
    methods: HashMap<u16, CompressionMethod>,
    default: CompressionMethod,
}

impl CompressionRegistry {
    /// Creates a registry holding only `default`.
    pub fn new(default: CompressionMethod) -> Self {
        let mut methods = HashMap::new();
        methods.insert(default.id(), default);
        Self { methods, default }
    }

    /// Creates the standard registry: DEFLATE and Snappy, DEFLATE default.
    pub fn standard() -> Self {
        let mut registry = Self::new(CompressionMethod::Deflate);
        registry.register(CompressionMethod::Snappy);
        registry
    }

    /// Inserts a method by its identifier, replacing any previous entry.
    pub fn register(&mut self, method: CompressionMethod) {
        self.methods.insert(method.id(), method);
    }

    /// Looks up a method by identifier.
    ///
    /// Unknown identifiers yield the default method and `false`; callers
    /// decide whether that is fatal.
    pub fn lookup(&self, id: u16) -> (CompressionMethod, bool) {
        match self.methods.get(&id) {
            Some(&method) => (method, true),
            None => (self.default, false),
        }
    }

    /// The registry's default method.
    pub fn default_method(&self) -> CompressionMethod {
        self.default
    }
}
