/*!
Read side of the flash backend.
*/

use log::debug;

use crashflow_core::{DumpStorage, Error, Result, StorageRegion};

/// Storage provider exposing the region tagged as the core dump
/// destination, if one is present.
///
/// Device integrations look the region up in their partition table and
/// hand it over here; an empty provider reports every lookup as
/// [`Error::NotFound`].
pub struct FlashStorage<R> {
    region: Option<R>,
}

impl<R: StorageRegion> FlashStorage<R> {
    pub fn new(region: R) -> Self {
        Self {
            region: Some(region),
        }
    }

    /// A provider without a tagged region.
    pub fn empty() -> Self {
        Self { region: None }
    }
}

impl<R: StorageRegion> DumpStorage for FlashStorage<R> {
    type Region = R;

    fn find_region(&mut self) -> Result<R> {
        match self.region.take() {
            Some(region) => {
                debug!(
                    "core dump region found at {:x}, {} bytes",
                    region.base(),
                    region.capacity()
                );
                Ok(region)
            }
            None => Err(Error::NotFound),
        }
    }
}
