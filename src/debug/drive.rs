// Drive state capture for tracing

use crate::drive::FloppyDrive;

/// A point-in-time copy of the drive's observable state.
///
/// The PC carries the backing-array projection for ROM addresses, the
/// way external observers see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveState {
    pub pc: u32,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: u8,
    pub cycles: u64,
    pub running: bool,
    pub led_on: bool,
}

impl DriveState {
    /// Capture the drive's observable state
    pub fn capture(drive: &FloppyDrive) -> Self {
        DriveState {
            pc: drive.projected_pc(),
            a: drive.cpu.a,
            x: drive.cpu.x,
            y: drive.cpu.y,
            sp: drive.cpu.sp,
            status: drive.cpu.status,
            cycles: drive.cpu.cycles,
            running: drive.is_running(),
            led_on: drive.controller.is_active(),
        }
    }
}

impl std::fmt::Display for DriveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04X}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{} {}{}",
            self.pc,
            self.a,
            self.x,
            self.y,
            self.status,
            self.sp,
            self.cycles,
            if self.running { "run" } else { "stop" },
            if self.led_on { " LED" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_projects_pc() {
        let mut drive = FloppyDrive::new();
        drive.cpu.pc = 0x0123;
        let state = DriveState::capture(&drive);
        assert_eq!(state.pc, 0x0123);
        assert!(state.running);
        assert!(!state.led_on);
    }
}
