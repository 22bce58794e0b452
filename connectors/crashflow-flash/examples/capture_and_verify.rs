use log::Level;

use crashflow_core::*;
use crashflow_flash::{FlashSink, FlashStorage, RamFlash};

/// A fabricated two-task crash used to exercise the full pipeline.
struct DemoCrash {
    tasks: [TaskHeader; 2],
}

impl CrashContext for DemoCrash {
    fn tasks_snapshot(&self, out: &mut [TaskHeader]) -> usize {
        let count = self.tasks.len().min(out.len());
        out[..count].copy_from_slice(&self.tasks[..count]);
        count
    }

    fn fault_tcb(&self) -> Address {
        self.tasks[1].tcb()
    }

    fn in_isr_context(&self) -> bool {
        false
    }

    fn frame_addr(&self) -> Address {
        Address::null()
    }

    fn isr_stack_end(&self) -> Address {
        Address::null()
    }
}

fn main() {
    simple_logger::init_with_level(Level::Debug).unwrap();

    let layout = TargetLayout {
        ram_start: Address::from(0x3ff0_0000),
        ram_end: Address::from(0x4000_0000),
        tcb_len: 154,
        max_stack_len: size::kb(64),
    };

    let crash = DemoCrash {
        tasks: [
            TaskHeader {
                tcb_addr: 0x3ff2_0000,
                stack_start: 0x3ff3_0000,
                stack_end: 0x3ff3_0400,
            },
            TaskHeader {
                tcb_addr: 0x3ff2_1000,
                stack_start: 0x3ff3_1000,
                stack_end: 0x3ff3_1400,
            },
        ],
    };
    let mem = DummyMemory::new()
        .map(Address::from(0x3ff2_0000), vec![0xb0; 0x200])
        .map(Address::from(0x3ff2_1000), vec![0xb1; 0x200])
        .map(Address::from(0x3ff3_0000), vec![0x51; 0x400])
        .map(Address::from(0x3ff3_1000), vec![0x52; 0x400]);

    let mut flash = RamFlash::new(Address::from(0x11_0000), size::kb(64));
    let mut tasks = [TaskHeader::default(); 16];
    {
        let mut sink = FlashSink::new(&mut flash, ChecksumKind::Crc32);
        let info = CoreDumpWriter::new(layout)
            .write_binary(&crash, &mem, &mut sink, &mut tasks)
            .unwrap();
        println!(
            "captured {} tasks ({} broken) into {} bytes",
            info.task_count, info.bad_task_count, info.total_len
        );
    }

    let mut storage = FlashStorage::new(flash);
    let (base, image_len) = locate_and_verify(&mut storage, ChecksumKind::Crc32).unwrap();
    println!("verified image at {:x}, {} bytes", base, image_len);
}
