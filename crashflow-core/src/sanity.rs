/*!
Plausibility checks for captured task state.

Task control blocks and stack bounds come out of a crashed address space
and are untrusted even though they live in local memory. Everything in
this module only reports; the capture runs where failing is not an
option, so callers aggregate the results instead of aborting.
*/

use crate::format::{word_pad, TaskHeader};
use crate::types::Address;

/// Address windows and fixed sizes of the capture target.
///
/// The exact bounds are a configuration of the target's memory map, not
/// part of the capture algorithm. Resolved once at startup and passed by
/// value into the writer.
#[derive(Copy, Clone, Debug)]
pub struct TargetLayout {
    /// First byte of target RAM that can hold task state.
    pub ram_start: Address,
    /// One past the last byte of target RAM.
    pub ram_end: Address,
    /// Unpadded size in bytes of one task control block.
    pub tcb_len: u32,
    /// Upper bound on a single plausible stack span in bytes.
    pub max_stack_len: u32,
}

impl TargetLayout {
    /// Word-padded TCB length as it is counted and written.
    pub const fn tcb_len_padded(&self) -> u32 {
        word_pad(self.tcb_len)
    }

    /// Checks wether `addr` points into target RAM.
    pub fn is_addr_sane(&self, addr: Address) -> bool {
        addr >= self.ram_start && addr < self.ram_end
    }

    /// Checks wether `len` bytes at `start` lie fully inside target RAM.
    pub fn is_region_sane(&self, start: Address, len: u32) -> bool {
        match start.checked_add(len) {
            Some(end) => self.is_addr_sane(start) && end <= self.ram_end,
            None => false,
        }
    }

    /// Checks wether a stack span is plausible: non-empty, bounded and
    /// fully inside target RAM.
    pub fn is_stack_sane(&self, start: Address, len: u32) -> bool {
        len > 0 && len <= self.max_stack_len && self.is_region_sane(start, len)
    }
}

/// Outcome of validating a single task record.
///
/// Plain flags instead of errors; one corrupted task must never halt
/// capture of the others.
#[derive(Copy, Clone, Debug, Default)]
pub struct TaskCheck {
    pub tcb_ok: bool,
    pub is_fault_task: bool,
    pub stack_ok: bool,
}

/// Validates one captured task record against the target layout.
///
/// `fault_tcb` is the control block address of the task the fault was
/// taken on; a record only counts as the fault task when its TCB also
/// checks out, so a corrupted fault task is reported as not found.
pub fn validate_task(layout: &TargetLayout, fault_tcb: Address, task: &TaskHeader) -> TaskCheck {
    let tcb_ok = layout.is_region_sane(task.tcb(), layout.tcb_len_padded());
    let is_fault_task = tcb_ok && task.tcb_addr == fault_tcb.as_u32();
    let stack_ok = task.stack_end > task.stack_start
        && layout.is_stack_sane(task.stack(), task.stack_len());

    TaskCheck {
        tcb_ok,
        is_fault_task,
        stack_ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::size;

    fn layout() -> TargetLayout {
        TargetLayout {
            ram_start: Address::from(0x3ff0_0000),
            ram_end: Address::from(0x4000_0000),
            tcb_len: 154,
            max_stack_len: size::kb(64),
        }
    }

    fn task(tcb: u32, start: u32, end: u32) -> TaskHeader {
        TaskHeader {
            tcb_addr: tcb,
            stack_start: start,
            stack_end: end,
        }
    }

    #[test]
    fn test_addr_bounds() {
        let layout = layout();
        assert!(layout.is_addr_sane(Address::from(0x3ff0_0000)));
        assert!(!layout.is_addr_sane(Address::from(0x4000_0000)));
        assert!(!layout.is_addr_sane(Address::from(0x100)));
    }

    #[test]
    fn test_region_overflow() {
        let layout = layout();
        assert!(!layout.is_region_sane(Address::from(0xffff_fff0), 0x100));
    }

    #[test]
    fn test_stack_sane() {
        let layout = layout();
        assert!(layout.is_stack_sane(Address::from(0x3ff1_0000), 0x1000));
        assert!(!layout.is_stack_sane(Address::from(0x3ff1_0000), 0));
        assert!(!layout.is_stack_sane(Address::from(0x3ff1_0000), size::kb(65)));
        assert!(!layout.is_stack_sane(Address::from(0x1000), 0x1000));
    }

    #[test]
    fn test_validate_good_task() {
        let layout = layout();
        let task = task(0x3ff2_0000, 0x3ff1_0000, 0x3ff1_1000);
        let check = validate_task(&layout, Address::from(0x3ff2_0000), &task);
        assert!(check.tcb_ok);
        assert!(check.is_fault_task);
        assert!(check.stack_ok);
    }

    #[test]
    fn test_validate_bad_stack() {
        let layout = layout();

        // stack pointer outside of ram
        let check = validate_task(
            &layout,
            Address::null(),
            &task(0x3ff2_0000, 0x200, 0x1200),
        );
        assert!(check.tcb_ok);
        assert!(!check.stack_ok);

        // inverted span
        let check = validate_task(
            &layout,
            Address::null(),
            &task(0x3ff2_0000, 0x3ff1_1000, 0x3ff1_0000),
        );
        assert!(!check.stack_ok);
    }

    #[test]
    fn test_corrupt_fault_tcb_is_not_found() {
        let layout = layout();
        let task = task(0x10, 0x3ff1_0000, 0x3ff1_1000);
        let check = validate_task(&layout, Address::from(0x10), &task);
        assert!(!check.tcb_ok);
        assert!(!check.is_fault_task);
    }
}
