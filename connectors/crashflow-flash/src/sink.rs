/*!
Write side of the flash backend.
*/

use log::{debug, error, info};

use crashflow_core::{ChecksumCtx, ChecksumKind, DumpSink, Error, Result};

use crate::region::FlashRegion;

/// Sink persisting the image into a flash region.
///
/// `prepare` checks that the image plus its integrity trailer fits the
/// region and returns the trailer-extended total, which the writer then
/// declares in the image header. Every chunk is folded into the running
/// checksum; `end` writes the trailer and flushes the region.
pub struct FlashSink<'a, R: FlashRegion> {
    region: &'a mut R,
    kind: ChecksumKind,
    checksum: Option<ChecksumCtx>,
    offset: u32,
}

impl<'a, R: FlashRegion> FlashSink<'a, R> {
    pub fn new(region: &'a mut R, kind: ChecksumKind) -> Self {
        info!(
            "core dump flash region at {:x}, {} bytes",
            FlashRegion::base(region),
            region.capacity()
        );
        Self {
            region,
            kind,
            checksum: Some(ChecksumCtx::new(kind)),
            offset: 0,
        }
    }

    /// Bytes persisted so far, trailer included once `end` ran.
    pub fn bytes_written(&self) -> u32 {
        self.offset
    }
}

impl<'a, R: FlashRegion> DumpSink for FlashSink<'a, R> {
    fn prepare(&mut self, total_len: u32) -> Result<u32> {
        let total = total_len
            .checked_add(self.kind.trailer_len())
            .ok_or(Error::InvalidSize)?;
        if total > self.region.capacity() {
            error!(
                "not enough space in flash region: image {} bytes, capacity {}",
                total,
                self.region.capacity()
            );
            return Err(Error::Sink("not enough space in flash region"));
        }
        debug!("core dump image spans {} bytes of flash", total);
        Ok(total)
    }

    fn start(&mut self) -> Result<()> {
        self.checksum = Some(ChecksumCtx::new(self.kind));
        self.offset = 0;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let checksum = self
            .checksum
            .as_mut()
            .ok_or(Error::Sink("image already finished"))?;
        checksum.update(data);
        self.region.write(self.offset, data)?;
        self.offset += data.len() as u32;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let checksum = self
            .checksum
            .take()
            .ok_or(Error::Sink("image already finished"))?;
        let trailer = checksum.finalize();
        self.region.write(self.offset, trailer.as_bytes())?;
        self.offset += trailer.as_bytes().len() as u32;
        self.region.sync()?;
        debug!("core dump image of {} bytes persisted", self.offset);
        Ok(())
    }
}
