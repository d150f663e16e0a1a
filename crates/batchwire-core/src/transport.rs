//! Transport abstraction for pluggable I/O.

use std::io::{self, Read, Write};

/// Source of raw frames.
///
/// This trait allows various transports (TCP streams, datagram sockets,
/// reliability layers that already deliver discrete frames) to be plugged
/// into a decoder without coupling to a concrete implementation. One call
/// yields the bytes of exactly one frame.
pub trait FrameSource {
    /// Reads one frame into `buf`, returning the number of bytes read.
    ///
    /// A frame larger than `buf` is a transport error; the codec never
    /// reassembles partial frames across calls.
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Sink for raw frames.
pub trait FrameSink {
    /// Writes one whole frame with a single underlying write.
    ///
    /// Some transports treat one write as one unreliable datagram, so a
    /// frame must never be split across writes. Short writes are errors.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Adapts any byte-stream reader into a [`FrameSource`].
///
/// One `read` call is assumed to deliver one frame, which holds for datagram
/// sockets and for stream transports with frame-per-segment delivery.
pub struct ReadSource<R>(pub R);

impl<R: Read> FrameSource for ReadSource<R> {
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// Adapts any byte-stream writer into a [`FrameSink`].
pub struct WriteSink<W>(pub W);

impl<W: Write> FrameSink for WriteSink<W> {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let written = self.0.write(frame)?;
        if written != frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short frame write: {} of {} bytes", written, frame.len()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_source_single_read() {
        let mut source = ReadSource(Cursor::new(vec![1u8, 2, 3]));
        let mut buf = [0u8; 8];
        let n = source.read_frame(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
    }

    #[test]
    fn test_write_sink_whole_frame() {
        let mut sink = WriteSink(Vec::new());
        sink.write_frame(&[9u8, 8, 7]).unwrap();
        assert_eq!(sink.0, vec![9, 8, 7]);
    }

    #[test]
    fn test_write_sink_short_write_is_error() {
        struct Half;
        impl Write for Half {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                Ok(buf.len() / 2)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut sink = WriteSink(Half);
        assert!(sink.write_frame(&[0u8; 10]).is_err());
    }
}
