/*!
Integrity protection of the persisted image.

Every image ends with a trailing checksum or digest computed over all
preceding bytes. The mode is resolved once at startup and passed by value
into the sink backend and the verifier; the two modes are never mixed
inside one image.
*/

use crate::error::{Error, Result};

use log::error;
use sha2::{Digest, Sha256};

/// Length in bytes of the trailing CRC32 field.
pub const CRC32_LEN: u32 = 4;

/// Length in bytes of the trailing SHA-256 field.
pub const SHA256_LEN: u32 = 32;

/// Integrity mode of the persisted image.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ChecksumKind {
    /// 32 bit cyclic checksum, stored as a little-endian word.
    Crc32,
    /// SHA-256 digest, stored as raw bytes.
    Sha256,
}

impl ChecksumKind {
    /// Length in bytes of the trailing integrity field for this mode.
    pub const fn trailer_len(self) -> u32 {
        match self {
            ChecksumKind::Crc32 => CRC32_LEN,
            ChecksumKind::Sha256 => SHA256_LEN,
        }
    }
}

/// Finished integrity trailer exactly as persisted at the end of the image.
#[derive(Copy, Clone)]
pub struct Trailer {
    buf: [u8; SHA256_LEN as usize],
    len: u8,
}

impl Trailer {
    /// The trailer bytes in persisted order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

/// Streaming integrity context used by sink backends.
///
/// Backends fold every chunk they persist into the context and emit the
/// finished [`Trailer`] after the last image byte.
pub enum ChecksumCtx {
    Crc32(crc32fast::Hasher),
    Sha256(Sha256),
}

impl ChecksumCtx {
    pub fn new(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::Crc32 => ChecksumCtx::Crc32(crc32fast::Hasher::new()),
            ChecksumKind::Sha256 => ChecksumCtx::Sha256(Sha256::new()),
        }
    }

    pub fn kind(&self) -> ChecksumKind {
        match self {
            ChecksumCtx::Crc32(_) => ChecksumKind::Crc32,
            ChecksumCtx::Sha256(_) => ChecksumKind::Sha256,
        }
    }

    /// Folds `data` into the running computation.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            ChecksumCtx::Crc32(hasher) => hasher.update(data),
            ChecksumCtx::Sha256(digest) => digest.update(data),
        }
    }

    /// Finishes the computation and returns the trailer bytes.
    pub fn finalize(self) -> Trailer {
        let mut buf = [0u8; SHA256_LEN as usize];
        match self {
            ChecksumCtx::Crc32(hasher) => {
                buf[..CRC32_LEN as usize].copy_from_slice(&hasher.finalize().to_le_bytes());
                Trailer {
                    buf,
                    len: CRC32_LEN as u8,
                }
            }
            ChecksumCtx::Sha256(digest) => {
                buf.copy_from_slice(&digest.finalize());
                Trailer {
                    buf,
                    len: SHA256_LEN as u8,
                }
            }
        }
    }
}

/// Verifies the trailing integrity field of a persisted image.
///
/// `data` is the full declared region. The trailer occupies its last
/// bytes and is excluded from its own input.
pub fn verify_trailer(kind: ChecksumKind, data: &[u8]) -> Result<()> {
    let trailer_len = kind.trailer_len() as usize;
    if data.len() < trailer_len {
        return Err(Error::InvalidSize);
    }
    let (body, stored) = data.split_at(data.len() - trailer_len);

    match kind {
        ChecksumKind::Crc32 => {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(body);
            let computed = hasher.finalize();
            let stored = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
            if stored != computed {
                error!(
                    "core dump data crc check failed: {:#x} -> {:#x}",
                    stored, computed
                );
                return Err(Error::InvalidChecksum);
            }
        }
        ChecksumKind::Sha256 => {
            let mut digest = Sha256::new();
            digest.update(body);
            let computed = digest.finalize();
            if computed.as_slice() != stored {
                error!("core dump data sha256 check failed");
                error!("calculated sha256: {:02x?}", computed.as_slice());
                error!("image sha256: {:02x?}", stored);
                return Err(Error::InvalidChecksum);
            }
        }
    }
    Ok(())
}
