//! Line codec: reassembles `\r\n`-terminated IRC messages from the stream.
//!
//! Incoming bytes are scanned with a two-state machine. A `\r` arms the
//! terminator; the byte after it must be `\n`, anything else is a protocol
//! violation (a lone carriage return). Messages are bounded at
//! [`MAX_LINE_LEN`] bytes including the terminator, so handlers never see
//! more than 510 bytes of payload. Each complete message is yielded exactly
//! once, in arrival order, for any chunking of the input.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::message::Message;

/// Maximum message length on the wire, including `\r\n`.
pub const MAX_LINE_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Normal,
    SawCr,
}

/// Codec for `\r\n`-terminated lines with the 512-byte IRC bound.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of the next unexamined byte, so bytes are scanned once.
    next_index: usize,
    state: Scan,
}

impl LineCodec {
    pub fn new() -> Self {
        Self {
            next_index: 0,
            state: Scan::Normal,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        let mut i = self.next_index;
        while i < src.len() {
            match self.state {
                Scan::Normal => {
                    if src[i] == b'\r' {
                        self.state = Scan::SawCr;
                    }
                }
                Scan::SawCr => {
                    if src[i] != b'\n' {
                        return Err(ProtocolError::MalformedMessage);
                    }
                    let line = src.split_to(i + 1);
                    self.next_index = 0;
                    self.state = Scan::Normal;
                    if line.len() > MAX_LINE_LEN {
                        return Err(ProtocolError::MessageTooLong);
                    }
                    let payload = &line[..line.len() - 2];
                    return Ok(Some(String::from_utf8_lossy(payload).into_owned()));
                }
            }
            i += 1;
        }
        self.next_index = i;

        // The buffer filled up without a terminator in sight.
        if src.len() >= MAX_LINE_LEN {
            return Err(ProtocolError::MessageTooLong);
        }
        Ok(None)
    }
}

impl Encoder<Message> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let line = msg.to_string();
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
