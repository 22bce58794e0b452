/*!
This crate contains the foundation of crashflow's crash-time core dump capture.

It provides the binary core dump [writer](writer/index.html) that runs on the
faulting execution context, the [sanity checks](sanity/index.html) applied to
captured task state, the [sink abstraction](sink/index.html) backends persist
the image through, and the [verifier](verify/index.html) that later locates
and integrity-checks the persisted image.

The crash path never allocates and never takes locks. All working state is
supplied by the caller as fixed-capacity buffers.
*/

#![cfg_attr(not(feature = "std"), no_std)]
extern crate no_std_compat as std;

pub mod error;
#[doc(hidden)]
pub use error::*;

pub mod types;
#[doc(hidden)]
pub use types::*;

pub mod format;
#[doc(hidden)]
pub use format::*;

pub mod checksum;
#[doc(hidden)]
pub use checksum::*;

pub mod sanity;
#[doc(hidden)]
pub use sanity::*;

pub mod mem;
#[doc(hidden)]
pub use mem::*;

pub mod snapshot;
#[doc(hidden)]
pub use snapshot::*;

pub mod sink;
#[doc(hidden)]
pub use sink::*;

pub mod writer;
#[doc(hidden)]
pub use writer::*;

pub mod verify;
#[doc(hidden)]
pub use verify::*;
