//! Cuts the inbound byte stream of a node connection into control frames.

use bytes::{Bytes, BytesMut};

use nexus_core::config::FrameMode;
use nexus_core::wire::NOTICE_TERMINATOR;

/// Bytes that end a frame in [`FrameMode::Delimited`].
const DELIMITERS: [u8; 2] = [b'\n', NOTICE_TERMINATOR as u8];

pub struct FrameDecoder {
    mode: FrameMode,
    max_len: usize,
    buf: BytesMut,
    /// Inside an oversized frame; skip to the next delimiter.
    discarding: bool,
    dropped: usize,
}

impl FrameDecoder {
    pub fn new(mode: FrameMode, max_len: usize) -> Self {
        Self {
            mode,
            max_len,
            buf: BytesMut::new(),
            discarding: false,
            dropped: 0,
        }
    }

    /// Feed one read's worth of bytes, get back every completed frame.
    /// Delimiters and a trailing `\r` are stripped; empty frames are skipped.
    pub fn decode(&mut self, data: &[u8]) -> Vec<Bytes> {
        match self.mode {
            FrameMode::PerRead => self.decode_per_read(data),
            FrameMode::Delimited => self.decode_delimited(data),
        }
    }

    /// End of stream. Returns the unterminated tail, if any.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.discarding {
            self.discarding = false;
            self.buf.clear();
            return None;
        }
        self.take_frame()
    }

    /// Frames thrown away for exceeding the length limit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn decode_per_read(&mut self, data: &[u8]) -> Vec<Bytes> {
        if data.len() > self.max_len {
            self.drop_frame(data.len());
            return Vec::new();
        }
        self.buf.extend_from_slice(data);
        self.take_frame().into_iter().collect()
    }

    fn decode_delimited(&mut self, data: &[u8]) -> Vec<Bytes> {
        let mut frames = Vec::new();
        let mut rest = data;

        while let Some(pos) = rest.iter().position(|b| DELIMITERS.contains(b)) {
            self.push_partial(&rest[..pos]);
            if self.discarding {
                self.discarding = false;
            } else if let Some(frame) = self.take_frame() {
                frames.push(frame);
            }
            rest = &rest[pos + 1..];
        }
        self.push_partial(rest);

        frames
    }

    fn push_partial(&mut self, chunk: &[u8]) {
        if self.discarding || chunk.is_empty() {
            return;
        }
        if self.buf.len() + chunk.len() > self.max_len {
            let len = self.buf.len() + chunk.len();
            self.buf.clear();
            self.discarding = true;
            self.drop_frame(len);
            return;
        }
        self.buf.extend_from_slice(chunk);
    }

    fn take_frame(&mut self) -> Option<Bytes> {
        let mut frame = self.buf.split();
        while frame.last().is_some_and(|b| *b == b'\r' || *b == b'\n') {
            frame.truncate(frame.len() - 1);
        }
        if frame.is_empty() {
            None
        } else {
            Some(frame.freeze())
        }
    }

    fn drop_frame(&mut self, len: usize) {
        self.dropped += 1;
        tracing::warn!(len, max = self.max_len, "dropping oversized frame");
    }
}
