//! Reassembly of fragmented inbound messages (RFC 6455 Section 5.4).

use bytes::BytesMut;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{Frame, OpCode};

/// Reassembles fragmented WebSocket messages.
///
/// Control frames are not handled here; the reader answers them itself and
/// they may arrive between the fragments of a data message.
#[derive(Debug)]
pub struct MessageAssembler {
    buffer: BytesMut,
    fragment_count: usize,
    opcode: Option<OpCode>,
    limits: Limits,
}

impl MessageAssembler {
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            fragment_count: 0,
            opcode: None,
            limits,
        }
    }

    /// Add a data frame to the message being assembled.
    ///
    /// Returns `Some(message)` once the frame carrying FIN arrives.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for a stray continuation or a new data
    ///   frame while a message is still open
    /// - `Error::TooManyFragments` / `Error::MessageTooLarge` on limit breaches
    ///
    /// Text is not checked here; [`AssembledMessage::into_message`] does it
    /// once for the whole message.
    pub fn push(&mut self, frame: Frame) -> Result<Option<AssembledMessage>> {
        if frame.opcode.is_control() {
            return Ok(None);
        }

        let opcode = match (frame.opcode, self.opcode) {
            (OpCode::Continuation, Some(opcode)) => opcode,
            (OpCode::Continuation, None) => {
                return Err(Error::ProtocolViolation(
                    "Unexpected continuation frame".into(),
                ));
            }
            (_, Some(_)) => {
                return Err(Error::ProtocolViolation(
                    "Expected continuation frame".into(),
                ));
            }
            (opcode, None) => opcode,
        };

        self.limits.check_fragment_count(self.fragment_count + 1)?;
        self.limits
            .check_message_size(self.buffer.len() + frame.payload().len())?;

        if frame.fin && self.opcode.is_none() {
            // Unfragmented: skip the copy through the buffer.
            return Ok(Some(AssembledMessage {
                opcode,
                payload: frame.into_payload(),
            }));
        }

        self.opcode = Some(opcode);
        self.buffer.extend_from_slice(frame.payload());
        self.fragment_count += 1;

        if !frame.fin {
            return Ok(None);
        }

        let payload = self.buffer.split().to_vec();
        self.reset();
        Ok(Some(AssembledMessage { opcode, payload }))
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.fragment_count = 0;
        self.opcode = None;
    }
}

/// A fully assembled data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledMessage {
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl AssembledMessage {
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Convert into a [`Message`], validating text as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUtf8` for a text payload that is not UTF-8.
    pub fn into_message(self) -> Result<Message> {
        match self.opcode {
            OpCode::Text => String::from_utf8(self.payload)
                .map(Message::Text)
                .map_err(|_| Error::InvalidUtf8),
            _ => Ok(Message::Binary(self.payload)),
        }
    }
}
