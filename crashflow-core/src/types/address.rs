/*!
Abstraction over a address on the target system.
*/

use core::fmt;
use core::ops;

/// This type represents a address on the capture target.
///
/// The targets this format was built for are 32 bit machines, so the
/// address is backed by a `u32` and is exactly the value that ends up in
/// the persisted task records.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Address(u32);

impl Address {
    /// A address with the value of zero.
    pub const NULL: Address = Address(0);

    /// Returns an address with a value of zero.
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks wether the address is zero or not.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns the address as a `u32` value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the address as a `u64` value.
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Returns the address as a `usize` value.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Adds `offs` to the address, returning `None` on overflow.
    pub fn checked_add(self, offs: u32) -> Option<Address> {
        self.0.checked_add(offs).map(Address)
    }
}

/// Converts a `u32` into a `Address`.
impl From<u32> for Address {
    fn from(item: u32) -> Self {
        Address(item)
    }
}

/// Converts a `Address` into a `u32`.
impl From<Address> for u32 {
    fn from(item: Address) -> Self {
        item.0
    }
}

/// Adds a `u32` to a `Address` which results in a `Address`.
impl ops::Add<u32> for Address {
    type Output = Self;

    fn add(self, other: u32) -> Self {
        Self(self.0 + other)
    }
}

/// Adds a `u32` to a `Address`.
impl ops::AddAssign<u32> for Address {
    fn add_assign(&mut self, other: u32) {
        *self = Self(self.0 + other)
    }
}

/// Subtracts a `Address` from a `Address` resulting in a `u32`.
impl ops::Sub for Address {
    type Output = u32;

    fn sub(self, other: Self) -> u32 {
        self.0 - other.0
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}
impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}
