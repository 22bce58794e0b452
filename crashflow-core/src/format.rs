/*!
Bit-exact on-storage layout of the binary core dump image.

The image is a flat stream: one [`CoreDumpHeader`], then one task record
per captured task with the fault task always first, then zero or one raw
memory segment, then the integrity trailer appended by the sink backend.
A task record is the [`TaskHeader`] followed by the word-padded TCB bytes
followed by the word-padded stack bytes.

All fields are native little-endian `u32` values of the 32 bit targets
this format is captured on.
*/

use crate::types::Address;

use dataview::Pod;

/// Version of the binary core dump layout.
pub const COREDUMP_VERSION: u32 = 1;

/// Machine word size of the capture target in bytes.
///
/// Every TCB and stack length is rounded up to this before it is counted
/// or written, so segment boundaries stay word aligned.
pub const WORD_SIZE: u32 = 4;

/// Rounds `len` up to the next word boundary.
pub const fn word_pad(len: u32) -> u32 {
    (len + WORD_SIZE - 1) & !(WORD_SIZE - 1)
}

/// The fixed header written once, first, after the total length is known.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CoreDumpHeader {
    pub data_len: u32,     // 0x00 total declared image length, trailer included
    pub version: u32,      // 0x04
    pub task_count: u32,   // 0x08 every snapshot task, broken ones included
    pub mem_seg_count: u32, // 0x0c
    pub tcb_len: u32,      // 0x10 word-padded
}

unsafe impl Pod for CoreDumpHeader {}

/// Captured state of one task, exactly as it appears in the image.
///
/// The record doubles as the snapshot entry filled in by the task
/// snapshot provider; the fault flag is derived during validation and is
/// never stored.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TaskHeader {
    pub tcb_addr: u32,    // 0x00
    pub stack_start: u32, // 0x04
    pub stack_end: u32,   // 0x08 one past the last stack byte
}

unsafe impl Pod for TaskHeader {}

impl TaskHeader {
    /// Address of this task's control block.
    pub fn tcb(&self) -> Address {
        Address::from(self.tcb_addr)
    }

    /// Start of this task's stack.
    pub fn stack(&self) -> Address {
        Address::from(self.stack_start)
    }

    /// Word-padded stack length as it is counted and written.
    ///
    /// An inverted span yields zero instead of wrapping.
    pub fn stack_len(&self) -> u32 {
        word_pad(self.stack_end.saturating_sub(self.stack_start))
    }
}

/// Describes one auxiliary raw memory segment appended after the tasks.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MemSegmentHeader {
    pub start: u32, // 0x00
    pub size: u32,  // 0x04
}

unsafe impl Pod for MemSegmentHeader {}
