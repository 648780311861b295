//! Scripted WebSocket peer for driving the client end to end.
//!
//! Each accepted connection completes the server side of the upgrade and
//! then follows a [`Script`]. Messages the client sends are forwarded to
//! the test through [`TestServer::next_received`].

use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use wsburst::protocol::handshake::find_head_end;
use wsburst::protocol::{AssembledMessage, Frame, MessageAssembler, OpCode};
use wsburst::{Endpoint, Error, Limits, Result, compute_accept_key};

/// What the peer does once the upgrade is done.
#[derive(Debug, Clone)]
pub enum Script {
    /// Drop the TCP connection right after the upgrade.
    HangUp,
    /// Send these frames, then a normal Close.
    SendThenClose(Vec<Frame>),
    /// Wait for the client's first message, then send these frames and a
    /// normal Close.
    ReadThenSend(Vec<Frame>),
    /// Forward every message until the client sends Close, then answer it.
    Collect,
    /// Read the upgrade request and never answer it.
    Silent,
}

pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    received: mpsc::UnboundedReceiver<AssembledMessage>,
}

impl TestServer {
    pub async fn spawn(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, received) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let script = script.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = Peer::new(socket).run(script, tx).await;
                });
            }
        });

        Self {
            addr,
            handle,
            received,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::ws(self.addr.to_string(), "/ws")
    }

    /// Next message (data or Pong) a client sent, waiting up to 5 seconds.
    pub async fn next_received(&mut self) -> Option<AssembledMessage> {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

struct Peer {
    socket: TcpStream,
    buf: BytesMut,
    assembler: MessageAssembler,
}

impl Peer {
    fn new(socket: TcpStream) -> Self {
        Self {
            socket,
            buf: BytesMut::with_capacity(64 * 1024),
            assembler: MessageAssembler::new(Limits::default()),
        }
    }

    async fn run(mut self, script: Script, seen: mpsc::UnboundedSender<AssembledMessage>) -> Result<()> {
        let key = self.read_upgrade().await?;
        if let Script::Silent = script {
            std::future::pending::<()>().await;
        }

        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\r\n",
            compute_accept_key(&key)
        );
        self.socket.write_all(response.as_bytes()).await?;

        match script {
            Script::HangUp | Script::Silent => return Ok(()),
            Script::Collect => {
                while let Some(message) = self.next_message().await? {
                    let _ = seen.send(message);
                }
                return self.send(&Frame::close(Some(1000), "")).await;
            }
            Script::SendThenClose(frames) => self.send_all(&frames).await?,
            Script::ReadThenSend(frames) => {
                if let Some(first) = self.next_message().await? {
                    let _ = seen.send(first);
                }
                self.send_all(&frames).await?;
            }
        }
        self.send(&Frame::close(Some(1000), "")).await?;

        // Drain until the client answers the Close or goes away.
        while let Some(message) = self.next_message().await? {
            let _ = seen.send(message);
        }
        Ok(())
    }

    /// Read the request head and return its Sec-WebSocket-Key.
    async fn read_upgrade(&mut self) -> Result<String> {
        let end = loop {
            if let Some(end) = find_head_end(&self.buf) {
                break end;
            }
            if self.socket.read_buf(&mut self.buf).await? == 0 {
                return Err(Error::InvalidHandshake("client went away".into()));
            }
        };
        let head = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf.advance(end);

        head.lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.trim()
                    .eq_ignore_ascii_case("sec-websocket-key")
                    .then(|| value.trim().to_string())
            })
            .ok_or_else(|| Error::InvalidHandshake("missing key".into()))
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match Frame::parse(&self.buf) {
                Ok((frame, consumed)) => {
                    self.buf.advance(consumed);
                    return Ok(Some(frame));
                }
                Err(Error::IncompleteFrame { .. }) => {}
                Err(e) => return Err(e),
            }
            if self.socket.read_buf(&mut self.buf).await? == 0 {
                return Ok(None);
            }
        }
    }

    /// Next data message or Pong; `None` on Close or end of stream.
    async fn next_message(&mut self) -> Result<Option<AssembledMessage>> {
        while let Some(frame) = self.read_frame().await? {
            match frame.opcode {
                OpCode::Close => return Ok(None),
                OpCode::Ping => {}
                OpCode::Pong => {
                    return Ok(Some(AssembledMessage {
                        opcode: OpCode::Pong,
                        payload: frame.into_payload(),
                    }));
                }
                OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                    if let Some(message) = self.assembler.push(frame)? {
                        return Ok(Some(message));
                    }
                }
            }
        }
        Ok(None)
    }

    async fn send(&mut self, frame: &Frame) -> Result<()> {
        let mut out = BytesMut::new();
        frame.encode(&mut out, None);
        self.socket.write_all(&out).await?;
        Ok(())
    }

    async fn send_all(&mut self, frames: &[Frame]) -> Result<()> {
        for frame in frames {
            self.send(frame).await?;
        }
        Ok(())
    }
}
