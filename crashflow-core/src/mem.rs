/*!
Access to the memory of the halted target.

The writer snapshots TCB blocks and stacks through the [`MemorySource`]
trait. Reads are raw, non-atomic views of possibly inconsistent memory,
acceptable because execution is halted for the whole capture.
*/

use crate::error::Result;
use crate::types::Address;

/// Read access to the address space the dump is captured from.
pub trait MemorySource {
    /// Returns a view of `len` bytes of target memory at `addr`.
    fn view(&self, addr: Address, len: u32) -> Result<&[u8]>;
}

/// Memory source reading the live address space of the current process.
///
/// Used on the real target, where the captured task addresses refer to
/// the same address space the writer itself runs in.
pub struct LiveMemory(());

impl LiveMemory {
    /// # Safety
    ///
    /// Every address range the writer reads through this source must be
    /// mapped and readable for the whole capture. The sanity pass vets
    /// the ranges against the configured target layout before any read,
    /// so the layout bounds must describe readable memory.
    pub unsafe fn new() -> Self {
        LiveMemory(())
    }
}

impl MemorySource for LiveMemory {
    fn view(&self, addr: Address, len: u32) -> Result<&[u8]> {
        Ok(unsafe { core::slice::from_raw_parts(addr.as_usize() as *const u8, len as usize) })
    }
}

#[cfg(any(feature = "dummy_mem", test))]
pub mod dummy {
    //! Deterministic buffer backed memory for tests.

    use std::prelude::v1::*;

    use super::MemorySource;
    use crate::error::{Error, Result};
    use crate::types::Address;

    /// Memory source backed by one or more disjoint owned regions.
    #[derive(Default)]
    pub struct DummyMemory {
        regions: Vec<(Address, Vec<u8>)>,
    }

    impl DummyMemory {
        pub fn new() -> Self {
            Self::default()
        }

        /// Maps `data` at `base`.
        pub fn map(mut self, base: Address, data: Vec<u8>) -> Self {
            self.regions.push((base, data));
            self
        }
    }

    impl MemorySource for DummyMemory {
        fn view(&self, addr: Address, len: u32) -> Result<&[u8]> {
            for (base, data) in self.regions.iter() {
                if addr >= *base && addr.as_usize() + len as usize <= base.as_usize() + data.len()
                {
                    let offs = (addr - *base) as usize;
                    return Ok(&data[offs..offs + len as usize]);
                }
            }
            Err(Error::Memory("address range is not mapped"))
        }
    }

}

#[cfg(any(feature = "dummy_mem", test))]
#[doc(hidden)]
pub use dummy::DummyMemory;
