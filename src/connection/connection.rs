use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::codec::{FrameReader, FrameWriter};
use crate::config::{Config, Limits};
use crate::connection::ConnectionState;
use crate::connection::fragmenter::MessageFragmenter;
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, Message};
use crate::protocol::{Frame, MessageAssembler, OpCode};

/// An established client-side WebSocket connection.
///
/// `Connection` is a thin pairing of a [`MessageReader`] and a
/// [`MessageWriter`] over the two halves of one stream. Use
/// [`split`](Connection::split) to hand the reader to a background task
/// while keeping the writer.
///
/// ```rust,ignore
/// let (mut reader, writer) = connection.split();
/// tokio::spawn(async move {
///     while let Ok(msg) = reader.recv().await {
///         println!("{} bytes", msg.len());
///     }
/// });
/// writer.send(Message::text("hello")).await?;
/// ```
pub struct Connection<T> {
    reader: MessageReader<T>,
    writer: MessageWriter<T>,
}

impl<T: AsyncRead + AsyncWrite> Connection<T> {
    /// Wrap a stream on which the opening handshake already completed.
    pub fn new(io: T, config: &Config) -> Self {
        Self::with_buffered(io, BytesMut::new(), config)
    }

    /// Like [`new`](Connection::new), with bytes the handshake read past the
    /// response head.
    pub fn with_buffered(io: T, buffered: BytesMut, config: &Config) -> Self {
        let (read_half, write_half) = tokio::io::split(io);
        let writer = MessageWriter::new(write_half, config);
        let reader = MessageReader {
            frames: FrameReader::with_buffered(read_half, buffered, config),
            assembler: MessageAssembler::new(config.limits.clone()),
            writer: writer.clone(),
            closed: None,
        };
        Self { reader, writer }
    }
}

impl<T> Connection<T> {
    /// Separate the read and write sides.
    pub fn split(self) -> (MessageReader<T>, MessageWriter<T>) {
        (self.reader, self.writer)
    }

    #[must_use]
    pub fn writer(&self) -> &MessageWriter<T> {
        &self.writer
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    pub async fn send(&self, message: Message) -> Result<()> {
        self.writer.send(message).await
    }

    pub async fn recv(&mut self) -> Result<Message> {
        self.reader.recv().await
    }
}

struct WriterInner<T> {
    frames: FrameWriter<WriteHalf<T>>,
    state: ConnectionState,
}

/// Write side of a [`Connection`].
///
/// Clones share one stream; each call holds the lock for the whole frame
/// sequence, so fragments of different messages never interleave.
pub struct MessageWriter<T> {
    inner: Arc<Mutex<WriterInner<T>>>,
    fragment_size: usize,
    limits: Limits,
}

impl<T> Clone for MessageWriter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            fragment_size: self.fragment_size,
            limits: self.limits.clone(),
        }
    }
}

impl<T> MessageWriter<T> {
    fn new(io: WriteHalf<T>, config: &Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WriterInner {
                frames: FrameWriter::new(io, config),
                state: ConnectionState::Open,
            })),
            fragment_size: config.fragment_size,
            limits: config.limits.clone(),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }
}

impl<T: AsyncWrite> MessageWriter<T> {
    /// Send a message.
    ///
    /// Data messages longer than `fragment_size` go out as several frames.
    /// Control messages are always a single frame; sending a Close moves the
    /// connection to `Closing`.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` if the connection is no longer `Open`
    /// - `Error::MessageTooLarge` if the message exceeds `max_message_size`
    /// - `Error::ControlFrameTooLarge` for a control payload over 125 bytes
    /// - `Error::Io` if the stream fails; the connection is then `Closed`
    pub async fn send(&self, message: Message) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.state.can_send() {
            return Err(Error::ConnectionClosed(None));
        }

        let result = if message.is_control() {
            let is_close = matches!(message, Message::Close(_));
            let frame = Frame::from(message);
            frame.validate()?;
            let result = inner.write(std::iter::once(frame)).await;
            if is_close && result.is_ok() {
                inner.state = ConnectionState::Closing;
            }
            result
        } else {
            let payload = message.payload();
            self.limits.check_message_size(payload.len())?;
            let opcode = if message.is_text() {
                OpCode::Text
            } else {
                OpCode::Binary
            };
            inner
                .write(MessageFragmenter::new(&payload, opcode, self.fragment_size))
                .await
        };

        if result.is_err() {
            inner.state = ConnectionState::Closed;
        }
        result
    }

    /// Start the close handshake.
    ///
    /// Does nothing unless the connection is `Open`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidCloseCode` for codes that must not appear on the wire,
    /// otherwise as [`send`](MessageWriter::send).
    pub async fn close(&self, code: CloseCode, reason: &str) -> Result<()> {
        if code.is_reserved() {
            return Err(Error::InvalidCloseCode(code.as_u16()));
        }
        if !self.state().await.can_send() {
            return Ok(());
        }
        self.send(Message::close(code, reason)).await
    }

    /// Shut down the write side of the stream and mark the connection closed.
    pub async fn shutdown(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.state = ConnectionState::Closed;
        inner.frames.shutdown().await
    }

    /// Write a control reply from the read side, if the connection still
    /// accepts writes.
    async fn reply(&self, frame: Frame) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.state.can_send() {
            return Ok(());
        }
        let result = inner.write(std::iter::once(frame)).await;
        if result.is_err() {
            inner.state = ConnectionState::Closed;
        }
        result
    }

    /// Record the peer's Close and echo it if we had not sent ours yet.
    async fn acknowledge_close(&self, close: Option<&CloseFrame>) {
        let mut inner = self.inner.lock().await;
        let (next, echo) = inner.state.on_peer_close();
        if echo {
            let frame = Frame::close(close.map(|cf| cf.code.as_u16()), "");
            if let Err(e) = inner.write(std::iter::once(frame)).await {
                debug!("close echo failed: {e}");
            }
        }
        inner.state = next;
    }
}

impl<T: AsyncWrite> WriterInner<T> {
    async fn write(&mut self, frames: impl IntoIterator<Item = Frame>) -> Result<()> {
        for frame in frames {
            self.frames.write_frame(&frame).await?;
        }
        self.frames.flush().await
    }
}

/// Read side of a [`Connection`].
///
/// Answers Ping with Pong and echoes Close through the shared writer, and
/// reassembles fragmented data messages.
pub struct MessageReader<T> {
    frames: FrameReader<ReadHalf<T>>,
    assembler: MessageAssembler,
    writer: MessageWriter<T>,
    closed: Option<Option<u16>>,
}

impl<T: AsyncRead + AsyncWrite> MessageReader<T> {
    /// Receive the next message.
    ///
    /// A Close from the peer is returned once as `Message::Close`; every
    /// later call fails with `Error::ConnectionClosed` carrying its code.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` after a Close or at end of stream
    /// - protocol errors (bad frames, UTF-8, limits)
    /// - `Error::Io` on socket failure
    pub async fn recv(&mut self) -> Result<Message> {
        if let Some(code) = self.closed {
            return Err(Error::ConnectionClosed(code));
        }
        match self.next_message().await {
            Ok(message) => {
                if let Message::Close(close) = &message {
                    self.closed = Some(close.as_ref().map(|cf| cf.code.as_u16()));
                }
                Ok(message)
            }
            Err(e) => {
                self.closed = Some(None);
                Err(e)
            }
        }
    }

    async fn next_message(&mut self) -> Result<Message> {
        loop {
            let frame = self.frames.read_frame().await?;
            match frame.opcode {
                OpCode::Ping => {
                    let payload = frame.into_payload();
                    self.writer.reply(Frame::pong(payload.clone())).await?;
                    return Ok(Message::Ping(payload));
                }
                OpCode::Pong => return Ok(Message::Pong(frame.into_payload())),
                OpCode::Close => {
                    let close = CloseFrame::from_payload(frame.payload());
                    self.writer.acknowledge_close(close.as_ref()).await;
                    return Ok(Message::Close(close));
                }
                OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                    if let Some(assembled) = self.assembler.push(frame)? {
                        return assembled.into_message();
                    }
                }
            }
        }
    }
}
