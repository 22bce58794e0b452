/*!
Binary core dump writer.

Runs exactly once, synchronously, on the faulting execution context. The
capture is two passes over the same task records: a sizing pass that
validates every record and accumulates the exact total length, then an
emission pass that streams the image through the sink in strict order.
Several sinks need the final size before the first byte (a flash backend
reserves its region with it), and appending after the fact is impossible
in this environment.

Emission order is fixed: header, fault task record, remaining task
records in snapshot order, optional interrupt stack segment. The first
fatal sink error aborts the capture; a partially written image is
useless, not partially useful.
*/

use std::mem::size_of;

use dataview::Pod;
use log::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::format::{CoreDumpHeader, MemSegmentHeader, TaskHeader, COREDUMP_VERSION};
use crate::mem::MemorySource;
use crate::sanity::{validate_task, TargetLayout};
use crate::sink::DumpSink;
use crate::snapshot::CrashContext;
use crate::types::Address;

/// Chunk size used when staging target memory into the sink.
const COPY_CHUNK: usize = 128;

/// Report of a finished capture.
#[derive(Copy, Clone, Debug)]
pub struct CaptureInfo {
    /// Total declared image length, integrity trailer included.
    pub total_len: u32,
    /// Number of task records in the image, broken ones included.
    pub task_count: u32,
    /// Number of tasks whose TCB or stack failed validation. A
    /// diagnostic, not an error; their records are still in the image.
    pub bad_task_count: u32,
    /// False when no fault task could be identified and record 0 was
    /// substituted. Consumers should treat such a capture as degraded.
    pub fault_task_found: bool,
}

/// Binary core dump writer.
pub struct CoreDumpWriter {
    layout: TargetLayout,
}

impl CoreDumpWriter {
    pub fn new(layout: TargetLayout) -> Self {
        Self { layout }
    }

    /// Captures a core dump of `ctx` through `sink`.
    ///
    /// `tasks` is the caller supplied record buffer; its length is the
    /// capacity of the capture and bounds how many tasks the image can
    /// hold. The snapshot provider fills it and may return fewer records
    /// than there are live tasks.
    pub fn write_binary<C, M, S>(
        &self,
        ctx: &C,
        mem: &M,
        sink: &mut S,
        tasks: &mut [TaskHeader],
    ) -> Result<CaptureInfo>
    where
        C: CrashContext,
        M: MemorySource,
        S: DumpSink,
    {
        let count = ctx.tasks_snapshot(tasks).min(tasks.len());
        let tasks = &mut tasks[..count];
        info!("found tasks: {}", tasks.len());
        if tasks.is_empty() {
            error!("task snapshot is empty");
            return Err(Error::InvalidArgument);
        }

        let tcb_len = self.layout.tcb_len_padded();
        let fault_tcb = ctx.fault_tcb();

        // Sizing pass. Bad tasks are counted and kept; a record whose
        // stack failed the check is clamped to an empty span so both
        // passes derive the same length from the same bounds.
        let mut data_len = size_of::<CoreDumpHeader>() as u32;
        let mut bad_tasks = 0u32;
        let mut fault_idx = None;
        for (task_id, task) in tasks.iter_mut().enumerate() {
            let check = validate_task(&self.layout, fault_tcb, task);
            if !check.tcb_ok || !check.stack_ok {
                bad_tasks += 1;
            }
            if !check.stack_ok {
                task.stack_end = task.stack_start;
            }
            if check.is_fault_task {
                debug!(
                    "task #{} (tcb {:x}) is the first crashed task",
                    task_id, task.tcb_addr
                );
                fault_idx = Some(task_id);
            }
            data_len += size_of::<TaskHeader>() as u32 + tcb_len + task.stack_len();
        }

        let fault_task_found = fault_idx.is_some();
        let fault_idx = fault_idx.unwrap_or_else(|| {
            error!("the current crashed task could not be identified, using record 0");
            0
        });

        // A fault taken on the interrupt stack supersedes the task
        // stack: the record is retargeted to the interrupt stack bounds
        // and the original task stack goes out as an extra segment.
        let mut isr_seg = None;
        if ctx.in_isr_context() {
            let task = &mut tasks[fault_idx];
            let seg = MemSegmentHeader {
                start: task.stack_start,
                size: task.stack_len(),
            };
            if seg.size != 0 {
                data_len += size_of::<MemSegmentHeader>() as u32;
                isr_seg = Some(seg);
            }
            task.stack_start = ctx.frame_addr().as_u32();
            task.stack_end = ctx.isr_stack_end().as_u32();
            data_len += task.stack_len();
            debug!("added interrupt stack of {} bytes", task.stack_len());
        }

        debug!(
            "core dump length={}, tasks processed: {}, broken tasks: {}",
            data_len,
            tasks.len(),
            bad_tasks
        );

        let data_len = sink.prepare(data_len).map_err(|err| {
            error!("failed to prepare core dump, error={}", err);
            err
        })?;

        sink.start().map_err(|err| {
            error!("failed to start core dump, error={}", err);
            err
        })?;

        let hdr = CoreDumpHeader {
            data_len,
            version: COREDUMP_VERSION,
            task_count: tasks.len() as u32,
            mem_seg_count: isr_seg.is_some() as u32,
            tcb_len,
        };
        sink.write(hdr.as_bytes()).map_err(|err| {
            error!("failed to write core dump header, error={}", err);
            err
        })?;

        // The fault task is always the first record after the header,
        // wherever it sat in the snapshot.
        self.save_task(mem, sink, &tasks[fault_idx]).map_err(|err| {
            error!(
                "failed to save first crashed task #{} (tcb {:x}), error={}",
                fault_idx, tasks[fault_idx].tcb_addr, err
            );
            err
        })?;
        for (task_id, task) in tasks.iter().enumerate() {
            if task_id == fault_idx {
                continue;
            }
            self.save_task(mem, sink, task).map_err(|err| {
                error!(
                    "failed to save core dump task #{} (tcb {:x}), error={}",
                    task_id, task.tcb_addr, err
                );
                err
            })?;
        }

        if let Some(seg) = isr_seg {
            self.save_mem_segment(mem, sink, &seg).map_err(|err| {
                error!("failed to save interrupted task stack, error={}", err);
                err
            })?;
        }

        sink.end().map_err(|err| {
            error!("failed to end core dump, error={}", err);
            err
        })?;

        if bad_tasks != 0 {
            error!("found {} broken tasks!", bad_tasks);
        }

        Ok(CaptureInfo {
            total_len: data_len,
            task_count: tasks.len() as u32,
            bad_task_count: bad_tasks,
            fault_task_found,
        })
    }

    /// Emits one task record: header, word-padded TCB block, stack bytes.
    fn save_task<M, S>(&self, mem: &M, sink: &mut S, task: &TaskHeader) -> Result<()>
    where
        M: MemorySource,
        S: DumpSink,
    {
        sink.write(task.as_bytes()).map_err(|err| {
            error!("failed to write task header, error={}", err);
            err
        })?;

        // A TCB that failed validation cannot be read safely; its slot
        // is zero filled so the declared layout still holds.
        let tcb_len = self.layout.tcb_len_padded();
        let tcb_readable = self.layout.is_region_sane(task.tcb(), tcb_len);
        copy_or_zero(mem, sink, task.tcb(), tcb_len, tcb_readable).map_err(|err| {
            error!("failed to write TCB ({:x}), error={}", task.tcb_addr, err);
            err
        })?;

        copy_or_zero(mem, sink, task.stack(), task.stack_len(), true).map_err(|err| {
            error!(
                "failed to write stack for task (tcb {:x}), stack_start={:x}, error={}",
                task.tcb_addr, task.stack_start, err
            );
            err
        })?;

        debug!("task (tcb {:x}) dump is saved", task.tcb_addr);
        Ok(())
    }

    /// Emits one raw memory segment.
    ///
    /// The segment bounds were computed by the writer itself, so a
    /// failed sanity check here is an internal inconsistency and fatal,
    /// unlike the per-task checks.
    fn save_mem_segment<M, S>(&self, mem: &M, sink: &mut S, seg: &MemSegmentHeader) -> Result<()>
    where
        M: MemorySource,
        S: DumpSink,
    {
        if !self.layout.is_stack_sane(Address::from(seg.start), seg.size) {
            error!("memory segment ({:x}, {}) is not sane", seg.start, seg.size);
            return Err(Error::Other("memory segment failed sanity check"));
        }

        sink.write(seg.as_bytes()).map_err(|err| {
            error!("failed to write memory segment header, error={}", err);
            err
        })?;
        copy_or_zero(mem, sink, Address::from(seg.start), seg.size, true).map_err(|err| {
            error!(
                "failed to write memory segment ({:x}, {}), error={}",
                seg.start, seg.size, err
            );
            err
        })?;

        debug!("memory segment ({:x}, {}) is saved", seg.start, seg.size);
        Ok(())
    }
}

/// Streams `len` bytes of target memory into the sink in fixed chunks.
///
/// Unreadable ranges become zero fill instead of aborting: the declared
/// layout must hold even when the bytes themselves are lost.
fn copy_or_zero<M, S>(mem: &M, sink: &mut S, addr: Address, len: u32, readable: bool) -> Result<()>
where
    M: MemorySource,
    S: DumpSink,
{
    let zero = [0u8; COPY_CHUNK];
    let mut offs = 0u32;
    while offs < len {
        let chunk = (len - offs).min(COPY_CHUNK as u32);
        let view = if readable {
            match mem.view(addr + offs, chunk) {
                Ok(view) => view,
                Err(err) => {
                    warn!(
                        "unreadable {} bytes at {:x}: {}",
                        chunk,
                        (addr + offs).as_u32(),
                        err
                    );
                    &zero[..chunk as usize]
                }
            }
        } else {
            &zero[..chunk as usize]
        };
        sink.write(view)?;
        offs += chunk;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::prelude::v1::*;

    use super::*;
    use super::Result;
    use crate::mem::DummyMemory;
    use crate::sink::BufferSink;
    use crate::types::size;

    const RAM_START: u32 = 0x3ff0_0000;
    const TCB_LEN: u32 = 154; // padded to 156

    fn layout() -> TargetLayout {
        TargetLayout {
            ram_start: Address::from(RAM_START),
            ram_end: Address::from(0x4000_0000),
            tcb_len: TCB_LEN,
            max_stack_len: size::kb(64),
        }
    }

    struct TestContext {
        tasks: Vec<TaskHeader>,
        fault_tcb: Address,
        isr: Option<(Address, Address)>,
    }

    impl CrashContext for TestContext {
        fn tasks_snapshot(&self, out: &mut [TaskHeader]) -> usize {
            let count = self.tasks.len().min(out.len());
            out[..count].copy_from_slice(&self.tasks[..count]);
            count
        }

        fn fault_tcb(&self) -> Address {
            self.fault_tcb
        }

        fn in_isr_context(&self) -> bool {
            self.isr.is_some()
        }

        fn frame_addr(&self) -> Address {
            self.isr.unwrap().0
        }

        fn isr_stack_end(&self) -> Address {
            self.isr.unwrap().1
        }
    }

    /// Builds `n` tasks with distinct filler bytes, maps their TCBs and
    /// stacks, and returns the context plus the backing memory.
    fn test_setup(n: u32, fault: usize) -> (TestContext, DummyMemory) {
        let mut tasks = Vec::new();
        let mut mem = DummyMemory::new();
        for i in 0..n {
            let tcb_addr = RAM_START + i * 0x1000;
            let stack_start = RAM_START + 0x10_0000 + i * 0x1000;
            let stack_len = 0x200 + i * 4;
            tasks.push(TaskHeader {
                tcb_addr,
                stack_start,
                stack_end: stack_start + stack_len,
            });
            mem = mem
                .map(Address::from(tcb_addr), vec![0xb0 + i as u8; 0x200])
                .map(
                    Address::from(stack_start),
                    vec![0x50 + i as u8; stack_len as usize + 4],
                );
        }
        let fault_tcb = tasks[fault].tcb();
        (
            TestContext {
                tasks,
                fault_tcb,
                isr: None,
            },
            mem,
        )
    }

    fn parse_header(image: &[u8]) -> CoreDumpHeader {
        let mut hdr = CoreDumpHeader::default();
        hdr.as_bytes_mut()
            .copy_from_slice(&image[..size_of::<CoreDumpHeader>()]);
        hdr
    }

    fn first_task(image: &[u8]) -> TaskHeader {
        let mut task = TaskHeader::default();
        let offs = size_of::<CoreDumpHeader>();
        task.as_bytes_mut()
            .copy_from_slice(&image[offs..offs + size_of::<TaskHeader>()]);
        task
    }

    #[test]
    fn test_declared_length_matches_emitted_bytes() {
        let (ctx, mem) = test_setup(3, 0);
        let mut sink = BufferSink::new();
        let mut tasks = [TaskHeader::default(); 8];

        let info = CoreDumpWriter::new(layout())
            .write_binary(&ctx, &mem, &mut sink, &mut tasks)
            .unwrap();

        let image = sink.into_inner();
        assert_eq!(image.len() as u32, info.total_len);

        let hdr = parse_header(&image);
        assert_eq!(hdr.data_len, info.total_len);
        assert_eq!(hdr.version, COREDUMP_VERSION);
        assert_eq!(hdr.task_count, 3);
        assert_eq!(hdr.mem_seg_count, 0);
        assert_eq!(hdr.tcb_len, 156);
    }

    #[test]
    fn test_fault_task_is_written_first() {
        let (ctx, mem) = test_setup(4, 2);
        let mut sink = BufferSink::new();
        let mut tasks = [TaskHeader::default(); 8];

        let info = CoreDumpWriter::new(layout())
            .write_binary(&ctx, &mem, &mut sink, &mut tasks)
            .unwrap();
        assert!(info.fault_task_found);

        let first = first_task(sink.as_bytes());
        assert_eq!(first.tcb_addr, ctx.tasks[2].tcb_addr);
    }

    #[test]
    fn test_fault_task_fallback_to_record_zero() {
        let (mut ctx, mem) = test_setup(3, 0);
        ctx.fault_tcb = Address::from(0xdead_0000); // matches no record
        let mut sink = BufferSink::new();
        let mut tasks = [TaskHeader::default(); 8];

        let info = CoreDumpWriter::new(layout())
            .write_binary(&ctx, &mem, &mut sink, &mut tasks)
            .unwrap();
        assert!(!info.fault_task_found);

        let first = first_task(sink.as_bytes());
        assert_eq!(first.tcb_addr, ctx.tasks[0].tcb_addr);
    }

    #[test]
    fn test_broken_task_is_counted_and_kept() {
        let (mut ctx, mem) = test_setup(5, 0);
        // task 2 points its stack outside of ram
        ctx.tasks[2].stack_start = 0x200;
        ctx.tasks[2].stack_end = 0x1200;
        let mut sink = BufferSink::new();
        let mut tasks = [TaskHeader::default(); 8];

        let info = CoreDumpWriter::new(layout())
            .write_binary(&ctx, &mem, &mut sink, &mut tasks)
            .unwrap();

        assert_eq!(info.task_count, 5);
        assert_eq!(info.bad_task_count, 1);
        assert_eq!(sink.as_bytes().len() as u32, info.total_len);

        let hdr = parse_header(sink.as_bytes());
        assert_eq!(hdr.task_count, 5);
    }

    #[test]
    fn test_isr_capture_retargets_fault_task() {
        let (mut ctx, mem) = test_setup(2, 1);
        let isr_start = Address::from(RAM_START + 0x20_0000);
        let isr_end = Address::from(RAM_START + 0x20_0400);
        ctx.isr = Some((isr_start, isr_end));
        let mem = mem.map(isr_start, vec![0xe5; 0x400]);

        let orig = ctx.tasks[1];
        let mut sink = BufferSink::new();
        let mut tasks = [TaskHeader::default(); 8];

        let info = CoreDumpWriter::new(layout())
            .write_binary(&ctx, &mem, &mut sink, &mut tasks)
            .unwrap();

        let image = sink.as_bytes();
        assert_eq!(image.len() as u32, info.total_len);

        let hdr = parse_header(image);
        assert_eq!(hdr.mem_seg_count, 1);

        // fault record now shows the interrupt stack bounds
        let first = first_task(image);
        assert_eq!(first.stack_start, isr_start.as_u32());
        assert_eq!(first.stack_end, isr_end.as_u32());

        // the trailing segment carries the pre-retarget task stack
        let seg_offs = image.len() - (size_of::<MemSegmentHeader>() + orig.stack_len() as usize);
        let mut seg = MemSegmentHeader::default();
        seg.as_bytes_mut()
            .copy_from_slice(&image[seg_offs..seg_offs + size_of::<MemSegmentHeader>()]);
        assert_eq!(seg.start, orig.stack_start);
        assert_eq!(seg.size, orig.stack_len());
        assert_eq!(image[seg_offs + size_of::<MemSegmentHeader>()], 0x51);
    }

    #[test]
    fn test_empty_snapshot_is_rejected() {
        let ctx = TestContext {
            tasks: Vec::new(),
            fault_tcb: Address::null(),
            isr: None,
        };
        let mem = DummyMemory::new();
        let mut sink = BufferSink::new();
        let mut tasks = [TaskHeader::default(); 8];

        let err = CoreDumpWriter::new(layout())
            .write_binary(&ctx, &mem, &mut sink, &mut tasks)
            .unwrap_err();
        assert_eq!(err, Error::InvalidArgument);
        assert!(sink.as_bytes().is_empty());
    }

    #[test]
    fn test_snapshot_capped_by_buffer_capacity() {
        let (ctx, mem) = test_setup(5, 0);
        let mut sink = BufferSink::new();
        let mut tasks = [TaskHeader::default(); 3];

        let info = CoreDumpWriter::new(layout())
            .write_binary(&ctx, &mem, &mut sink, &mut tasks)
            .unwrap();
        assert_eq!(info.task_count, 3);
    }

    struct FailingSink {
        writes_left: u32,
    }

    impl DumpSink for FailingSink {
        fn write(&mut self, _data: &[u8]) -> Result<()> {
            if self.writes_left == 0 {
                return Err(Error::Sink("write failed"));
            }
            self.writes_left -= 1;
            Ok(())
        }
    }

    #[test]
    fn test_first_sink_error_aborts_capture() {
        let (ctx, mem) = test_setup(3, 0);
        let mut sink = FailingSink { writes_left: 2 };
        let mut tasks = [TaskHeader::default(); 8];

        let err = CoreDumpWriter::new(layout())
            .write_binary(&ctx, &mem, &mut sink, &mut tasks)
            .unwrap_err();
        assert_eq!(err, Error::Sink("write failed"));
    }
}
