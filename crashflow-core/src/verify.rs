/*!
Locating and verifying a persisted core dump image.

Runs outside of crash context. The image is found through the storage
seam, its declared size is read from the first word and bounds-checked
against the physical region, and the integrity trailer is verified
before any consumer is allowed to trust the contents. Mapped views are
held only for the minimum span needed: map, read, drop, remap.
*/

use log::{debug, error, info};

use crate::checksum::{verify_trailer, ChecksumKind};
use crate::error::{Error, Result};
use crate::format::WORD_SIZE;
use crate::types::Address;

/// One storage region that may hold a persisted image.
pub trait StorageRegion {
    /// Base address of the region on its storage device.
    fn base(&self) -> Address;

    /// Physical capacity of the region in bytes.
    fn capacity(&self) -> u32;

    /// Maps the first `len` bytes of the region.
    ///
    /// The returned view lives until the next call; implementations are
    /// free to unmap as soon as the borrow ends.
    fn map(&mut self, len: u32) -> Result<&[u8]>;
}

/// Discovery of the storage region tagged as the core dump destination.
pub trait DumpStorage {
    type Region: StorageRegion;

    /// Finds the tagged region. Absence is an ordinary [`Error::NotFound`],
    /// not a fault; a device that never crashed has no image.
    fn find_region(&mut self) -> Result<Self::Region>;
}

/// Locates the persisted image and verifies its integrity.
///
/// On success returns the region base address and the verified image
/// size. The caller performs any further mapping needed to parse the
/// body; nothing stays mapped when this returns.
pub fn locate_and_verify<S>(storage: &mut S, kind: ChecksumKind) -> Result<(Address, u32)>
where
    S: DumpStorage,
{
    let mut region = storage.find_region().map_err(|err| {
        error!("no core dump storage region found");
        err
    })?;

    if region.capacity() < WORD_SIZE {
        error!("core dump storage region is too small");
        return Err(Error::InvalidSize);
    }

    // First mapping covers a single word: the declared total length.
    let declared = {
        let word = region.map(WORD_SIZE)?;
        u32::from_le_bytes([word[0], word[1], word[2], word[3]])
    };
    debug!("declared core dump image size: {}", declared);

    if declared < WORD_SIZE || declared > region.capacity() {
        error!("incorrect size of core dump image: {}", declared);
        return Err(Error::InvalidSize);
    }
    // The trailer must fit inside the declared region, otherwise the
    // verification window would be self-referential.
    if declared < kind.trailer_len() {
        error!("core dump image smaller than its integrity trailer");
        return Err(Error::InvalidSize);
    }

    let data = region.map(declared)?;
    verify_trailer(kind, data)?;

    info!(
        "core dump image at {:x} ({} bytes) verified",
        region.base(),
        declared
    );
    Ok((region.base(), declared))
}
