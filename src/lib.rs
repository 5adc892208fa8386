// C64 Emulator Library
// Core emulation library: C64 main unit plus the 1541 floppy drive

// Public modules
pub mod bus;
pub mod cpu;
pub mod debug;
pub mod drive;
pub mod emulator;
pub mod io_chip;
pub mod memory;
pub mod via;
pub mod vic;

// Re-export main types for convenience
pub use bus::C64Bus;
pub use cpu::{Cpu, CpuBus, InterruptSource, StepResult};
pub use debug::{disassemble, CpuState, DriveState, LogLevel, Logger, TraceEntry};
pub use drive::{
    DiskBackend, DiskController, DiskError, EmulationError, FloppyDrive, MemoryDisk, RomError,
};
pub use emulator::{
    save_screenshot, Emulator, EmulatorConfig, RecentDisksList, ScreenshotError, SnapshotError,
    SnapshotReader, SnapshotWriter,
};
pub use io_chip::IoChip;
pub use memory::{new_shared_ram, DriveMemory, SharedRam};
pub use via::Via;
pub use vic::{Sprite, Vic};
