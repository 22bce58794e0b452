/*!
Flash region backed by a memory mapped file.

Used on hosts to work with dumped partition images: verify an image
pulled off a device, or act as the capture destination in simulation.
*/

use std::fs::OpenOptions;
use std::path::Path;

use memmap::{MmapMut, MmapOptions};

use crashflow_core::{Address, Error, Result, StorageRegion};

use crate::region::FlashRegion;

/// Flash region persisted in a memory mapped file.
pub struct FileFlash {
    base: Address,
    map: MmapMut,
}

impl FileFlash {
    /// Creates (or truncates) a region file of `capacity` bytes.
    pub fn create<P: AsRef<Path>>(path: P, base: Address, capacity: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|_| Error::Storage("unable to open region file"))?;
        file.set_len(capacity as u64)
            .map_err(|_| Error::Storage("unable to size region file"))?;

        let map = unsafe {
            MmapOptions::new()
                .map_mut(&file)
                .map_err(|_| Error::Storage("unable to map region file"))?
        };
        Ok(Self { base, map })
    }

    /// Opens an existing region file; the file length is the capacity.
    pub fn open<P: AsRef<Path>>(path: P, base: Address) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|_| Error::Storage("unable to open region file"))?;

        let map = unsafe {
            MmapOptions::new()
                .map_mut(&file)
                .map_err(|_| Error::Storage("unable to map region file"))?
        };
        Ok(Self { base, map })
    }
}

impl FlashRegion for FileFlash {
    fn base(&self) -> Address {
        self.base
    }

    fn capacity(&self) -> u32 {
        self.map.len() as u32
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let offset = offset as usize;
        if offset + data.len() > self.map.len() {
            return Err(Error::Sink("write beyond flash region"));
        }
        self.map[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, len: u32) -> Result<&[u8]> {
        if len as usize > self.map.len() {
            return Err(Error::Storage("read beyond flash region"));
        }
        Ok(&self.map[..len as usize])
    }

    fn sync(&mut self) -> Result<()> {
        self.map
            .flush()
            .map_err(|_| Error::Storage("unable to flush region file"))
    }
}

impl StorageRegion for FileFlash {
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
