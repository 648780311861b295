use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{Config, Limits};
use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameHeader, MaskGenerator};

/// Reads server frames from the inbound half of a connection.
#[derive(Debug)]
pub struct FrameReader<R> {
    io: R,
    read_buf: BytesMut,
    read_size: usize,
    limits: Limits,
}

impl<R> FrameReader<R> {
    #[must_use]
    pub fn new(io: R, config: &Config) -> Self {
        Self::with_buffered(io, BytesMut::new(), config)
    }

    /// Start from bytes that were already read past the handshake response.
    #[must_use]
    pub fn with_buffered(io: R, buffered: BytesMut, config: &Config) -> Self {
        let mut read_buf = buffered;
        read_buf.reserve(config.read_buffer_size);
        Self {
            io,
            read_buf,
            read_size: config.read_buffer_size.max(1),
            limits: config.limits.clone(),
        }
    }

    /// Reject a frame from its header alone, before its payload is buffered.
    fn check_header(&self, header: &FrameHeader) -> Result<()> {
        if header.mask.is_some() {
            return Err(Error::MaskedServerFrame);
        }
        if header.rsv1 || header.rsv2 || header.rsv3 {
            return Err(Error::ReservedBitsSet);
        }
        self.limits.check_frame_size(header.payload_len)
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read the next complete frame.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed(None)` if the stream ends
    /// - header and frame validation errors
    /// - `Error::Io` on socket failure
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match FrameHeader::parse(&self.read_buf) {
                Ok(header) => {
                    self.check_header(&header)?;
                    match Frame::parse(&self.read_buf) {
                        Ok((frame, consumed)) => {
                            self.read_buf.advance(consumed);
                            frame.validate()?;
                            return Ok(frame);
                        }
                        Err(Error::IncompleteFrame { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                Err(Error::IncompleteFrame { .. }) => {}
                Err(e) => return Err(e),
            }

            self.read_buf.reserve(self.read_size);
            let n = self.io.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed(None));
            }
        }
    }
}

/// Writes masked client frames to the outbound half of a connection.
#[derive(Debug)]
pub struct FrameWriter<W> {
    io: W,
    write_buf: BytesMut,
    masks: MaskGenerator,
}

impl<W> FrameWriter<W> {
    #[must_use]
    pub fn new(io: W, config: &Config) -> Self {
        Self {
            io,
            write_buf: BytesMut::with_capacity(config.write_buffer_size),
            masks: MaskGenerator::new(),
        }
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Encode `frame` with a fresh masking key and write it out.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the socket rejects the bytes.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mask = self.masks.next_mask();
        self.write_buf.clear();
        frame.encode(&mut self.write_buf, Some(mask));
        self.io.write_all(&self.write_buf).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.io.flush().await?;
        Ok(())
    }

    /// Shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}
