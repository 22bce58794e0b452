/*!
Abstract destination for the serialized image.

Backends persist the byte stream produced by the writer. The call order
contract is fixed: `prepare` → `start` → `write`* → `end`, with the two
outer hooks optional. Once writing has started there is no retry and no
backtracking; a backend that fails a call fails the whole capture.
*/

use std::prelude::v1::*;

use crate::error::Result;

/// Capability set implemented by dump destinations.
///
/// Only `write` is mandatory. `prepare` receives the exact total length
/// before the first byte and may return a larger value; backends that
/// append an integrity trailer do, and the returned total is what the
/// writer declares in the image header.
pub trait DumpSink {
    /// Sizing hook, called once before any byte is written.
    fn prepare(&mut self, total_len: u32) -> Result<u32> {
        Ok(total_len)
    }

    /// Called once after `prepare` and before the first `write`.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Appends `data` to the image. All-or-nothing per call; a partial
    /// write is not a defined outcome.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Called once after the last `write`.
    fn end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink collecting the image into a growable in-memory buffer.
///
/// Mostly useful on hosts and in tests; crash-time backends write into
/// preallocated storage instead.
#[derive(Default)]
pub struct BufferSink {
    buf: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The image bytes collected so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the sink and returns the collected image.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl DumpSink for BufferSink {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }
}
