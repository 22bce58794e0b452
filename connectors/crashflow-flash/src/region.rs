/*!
Flash-like regions the image is persisted into.
*/

use crashflow_core::{Address, Error, Result, StorageRegion};

/// Random access to one erasable flash region.
///
/// Implementations only move bytes; wear handling and erase granularity
/// are below this interface.
pub trait FlashRegion {
    /// Base address of the region on its storage device.
    fn base(&self) -> Address;

    /// Physical capacity of the region in bytes.
    fn capacity(&self) -> u32;

    /// Writes `data` at `offset` into the region.
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<()>;

    /// Returns the first `len` bytes of the region.
    fn read(&self, len: u32) -> Result<&[u8]>;

    /// Flushes buffered bytes to the device.
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Flash region emulated over an in-memory buffer.
///
/// New regions come up in erased state (all `0xff`), like NOR flash.
pub struct RamFlash {
    base: Address,
    buf: Vec<u8>,
}

impl RamFlash {
    pub fn new(base: Address, capacity: u32) -> Self {
        Self {
            base,
            buf: vec![0xff; capacity as usize],
        }
    }

    /// Wraps an existing image, e.g. bytes read back from a device.
    pub fn with_bytes(base: Address, buf: Vec<u8>) -> Self {
        Self { base, buf }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl FlashRegion for RamFlash {
    fn base(&self) -> Address {
        self.base
    }

    fn capacity(&self) -> u32 {
        self.buf.len() as u32
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let offset = offset as usize;
        if offset + data.len() > self.buf.len() {
            return Err(Error::Sink("write beyond flash region"));
        }
        self.buf[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, len: u32) -> Result<&[u8]> {
        if len as usize > self.buf.len() {
            return Err(Error::Storage("read beyond flash region"));
        }
        Ok(&self.buf[..len as usize])
    }
}

/// The region doubles as a verifier-side storage region.
impl StorageRegion for RamFlash {
    fn base(&self) -> Address {
        FlashRegion::base(self)
    }

    fn capacity(&self) -> u32 {
        FlashRegion::capacity(self)
    }

    fn map(&mut self, len: u32) -> Result<&[u8]> {
        self.read(len)
    }
}
