/*!
Flash region backend for crashflow.

This backend persists the core dump image into a dedicated flash-like
region and serves the verifier from the same region later. The write
side is [`FlashSink`]: it reserves the region in `prepare` (growing the
declared total by the integrity trailer), folds a running checksum over
every chunk and writes the trailer in `end`. The read side is
[`FlashStorage`], the [`DumpStorage`] provider handed to
`locate_and_verify`.

Two region implementations are provided: [`RamFlash`], an in-memory
emulated region, and [`FileFlash`] (behind the `filemap` feature), a
memory mapped file holding a dumped partition image.
*/

pub mod region;
#[doc(hidden)]
pub use region::{FlashRegion, RamFlash};

#[cfg(feature = "filemap")]
pub mod filemap;
#[cfg(feature = "filemap")]
#[doc(hidden)]
pub use filemap::FileFlash;

pub mod sink;
#[doc(hidden)]
pub use sink::FlashSink;

pub mod storage;
#[doc(hidden)]
pub use storage::FlashStorage;
