/*!
Transport stream sink for crashflow.

Streams the core dump image over any `std::io::Write` (such as a UART
bridge held by the panic handler) instead of persisting it into local
storage. The integrity trailer is computed over every streamed chunk
and appended at `end`, so the receiving side can feed the captured
bytes straight into the verifier's checksum window.
*/

use std::io::Write;

use log::{debug, error};

use crashflow_core::{ChecksumCtx, ChecksumKind, DumpSink, Error, Result};

/// Sink streaming the image into an `io::Write` transport.
pub struct IoDumpSink<T: Write> {
    writer: T,
    kind: ChecksumKind,
    checksum: Option<ChecksumCtx>,
}

impl<T: Write> IoDumpSink<T> {
    pub fn new(writer: T, kind: ChecksumKind) -> Self {
        Self {
            writer,
            kind,
            checksum: Some(ChecksumCtx::new(kind)),
        }
    }

    /// Consumes the sink and returns the underlying transport.
    pub fn into_inner(self) -> T {
        self.writer
    }
}

impl<T: Write> DumpSink for IoDumpSink<T> {
    fn prepare(&mut self, total_len: u32) -> Result<u32> {
        // The stream has no capacity to check; only account for the trailer.
        total_len
            .checked_add(self.kind.trailer_len())
            .ok_or(Error::InvalidSize)
    }

    fn start(&mut self) -> Result<()> {
        self.checksum = Some(ChecksumCtx::new(self.kind));
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let checksum = self
            .checksum
            .as_mut()
            .ok_or(Error::Sink("image already finished"))?;
        checksum.update(data);
        self.writer.write_all(data).map_err(|err| {
            error!("transport write failed: {}", err);
            Error::Sink("transport write failed")
        })
    }

    fn end(&mut self) -> Result<()> {
        let checksum = self
            .checksum
            .take()
            .ok_or(Error::Sink("image already finished"))?;
        self.writer
            .write_all(checksum.finalize().as_bytes())
            .map_err(|_| Error::Sink("transport write failed"))?;
        self.writer
            .flush()
            .map_err(|_| Error::Sink("transport flush failed"))?;
        debug!("core dump image streamed");
        Ok(())
    }
}
