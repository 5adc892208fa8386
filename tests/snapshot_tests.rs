// Snapshot integration tests
//
// The snapshot law: serialize then restore yields field-by-field
// equality, and both machines continue in lockstep afterwards.

mod common;

use c64_rs::drive::controller::job;
use c64_rs::{Emulator, EmulatorConfig, MemoryDisk};
use common::{patterned_block, RomBuilder};

fn emulator() -> Emulator {
    Emulator::with_config(EmulatorConfig::default())
}

#[test]
fn full_machine_roundtrip_with_drive() {
    let mut emu = emulator();
    emu.load_floppy_rom(&RomBuilder::new().reset_vector(0xC000).build())
        .unwrap();
    let mut disk = MemoryDisk::new();
    disk.set_block(18, 0, &patterned_block(1));
    emu.attach_disk(Box::new(disk), None);

    emu.load_program(0x0400, &[0xE8, 0xC8, 0x4C, 0x00, 0x04]); // INX; INY; loop
    for _ in 0..123 {
        emu.step().unwrap();
    }

    let payload = emu.snapshot_bytes();

    let mut restored = emulator();
    restored
        .load_floppy_rom(&RomBuilder::new().reset_vector(0xC000).build())
        .unwrap();
    restored.attach_disk(Box::new(MemoryDisk::new()), None);
    restored.restore_bytes(&payload).unwrap();

    // Field-by-field equality on the observable state
    assert_eq!(restored.cpu().x, emu.cpu().x);
    assert_eq!(restored.cpu().y, emu.cpu().y);
    assert_eq!(restored.cpu().pc, emu.cpu().pc);
    assert_eq!(restored.cpu().cycles, emu.cpu().cycles);
    assert_eq!(restored.vic().raster_line(), emu.vic().raster_line());
    assert_eq!(restored.drive().cpu.pc, emu.drive().cpu.pc);
    assert_eq!(restored.drive().cpu.cycles, emu.drive().cpu.cycles);
    assert_eq!(
        restored.drive().cpu.irq_sources,
        emu.drive().cpu.irq_sources
    );

    // Lockstep continuation
    for _ in 0..50 {
        emu.step().unwrap();
        restored.step().unwrap();
    }
    assert_eq!(restored.cpu().x, emu.cpu().x);
    assert_eq!(restored.cpu().cycles, emu.cpu().cycles);
    assert_eq!(restored.drive().cpu.pc, emu.drive().cpu.pc);
}

#[test]
fn drive_ram_survives_the_roundtrip() {
    let mut emu = emulator();
    emu.load_floppy_rom(&RomBuilder::new().reset_vector(0xF2B0).build())
        .unwrap();
    let mut disk = MemoryDisk::new();
    disk.set_block(18, 1, &patterned_block(9));
    emu.attach_disk(Box::new(disk), None);

    // Post a READ job and let the trap service it
    {
        let drive = emu.drive_mut();
        drive.memory.set(0, job::READ);
        drive.memory.set(0x06, 18);
        drive.memory.set(0x07, 1);
    }
    emu.step().unwrap();

    let payload = emu.snapshot_bytes();

    let mut restored = emulator();
    restored
        .load_floppy_rom(&RomBuilder::new().reset_vector(0xF2B0).build())
        .unwrap();
    restored.restore_bytes(&payload).unwrap();

    let mut buffer = [0u8; 256];
    restored.drive().memory.copy_out(0x0300, &mut buffer);
    assert_eq!(buffer, patterned_block(9), "Job buffer restored");
    assert_eq!(restored.drive().memory.get(0x4C), 1);
}

#[test]
fn snapshot_files_roundtrip_through_slots() {
    let dir = std::env::temp_dir().join("c64rs-slot-test");
    let mut config = EmulatorConfig::default();
    config.snapshot.directory = dir.clone();

    let mut emu = Emulator::with_config(config.clone());
    emu.load_program(0x0400, &[0xE8, 0x4C, 0x00, 0x04]);
    for _ in 0..42 {
        emu.step().unwrap();
    }

    emu.save_snapshot(3).unwrap();

    let mut restored = Emulator::with_config(config);
    restored.load_snapshot(3).unwrap();
    assert_eq!(restored.cpu().x, emu.cpu().x);
    assert_eq!(restored.cpu().cycles, emu.cpu().cycles);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn truncated_snapshot_is_rejected() {
    let mut emu = emulator();
    emu.load_program(0x0400, &[0xEA]);
    emu.step().unwrap();

    let payload = emu.snapshot_bytes();
    let mut restored = emulator();
    assert!(restored.restore_bytes(&payload[..payload.len() / 2]).is_err());
}
