/*!
Seam to the runtime the crash happened in.

Task enumeration and fault frame queries are answered by the port layer
of the embedded runtime; the writer only consumes this interface.
*/

use crate::format::TaskHeader;
use crate::types::Address;

/// Queries answered by the crashed runtime and its fault frame.
///
/// Implementations run on the faulting execution context and therefore
/// must not allocate, must not take locks and must not assume a healthy
/// runtime.
pub trait CrashContext {
    /// Fills `out` with up to `out.len()` captured task records and
    /// returns the number of records written. The returned count may be
    /// less than the number of live tasks.
    fn tasks_snapshot(&self, out: &mut [TaskHeader]) -> usize;

    /// Address of the faulting task's control block.
    fn fault_tcb(&self) -> Address;

    /// Wether the fault was taken on a dedicated interrupt stack instead
    /// of the task's own stack.
    fn in_isr_context(&self) -> bool;

    /// Address of the exception frame. When the fault happened in
    /// interrupt context this doubles as the start of the interrupt
    /// stack.
    fn frame_addr(&self) -> Address;

    /// One past the last byte of the interrupt stack.
    fn isr_stack_end(&self) -> Address;
}
