// Floppy ROM loading
//
// The drive firmware is an opaque 16KB binary fetched from an external
// resource provider and loaded at $C000 in the drive's address space
// (contiguously after RAM in the backing array). Patching the trap
// opcodes into it happens after loading, in `FloppyDrive::load_rom`.

use crate::memory::DRIVE_ROM_SIZE;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Resource name of the floppy firmware image
pub const FLOPPY_ROM_RESOURCE: &str = "roms/floppy.c64";

/// Errors while loading a ROM image
#[derive(Debug)]
pub enum RomError {
    /// I/O error
    Io(io::Error),

    /// The image is not exactly 16KB
    BadLength { expected: usize, found: usize },
}

impl fmt::Display for RomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomError::Io(e) => write!(f, "ROM I/O error: {}", e),
            RomError::BadLength { expected, found } => {
                write!(f, "ROM length {} (expected {})", found, expected)
            }
        }
    }
}

impl std::error::Error for RomError {}

impl From<io::Error> for RomError {
    fn from(e: io::Error) -> Self {
        RomError::Io(e)
    }
}

/// Validate a raw ROM image
pub fn validate_image(image: &[u8]) -> Result<(), RomError> {
    if image.len() != DRIVE_ROM_SIZE {
        return Err(RomError::BadLength {
            expected: DRIVE_ROM_SIZE,
            found: image.len(),
        });
    }
    Ok(())
}

/// Load and validate a ROM image from disk
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, RomError> {
    let image = fs::read(path)?;
    validate_image(&image)?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_wrong_length() {
        assert!(validate_image(&vec![0; DRIVE_ROM_SIZE]).is_ok());

        let err = validate_image(&[0; 100]).unwrap_err();
        match err {
            RomError::BadLength { expected, found } => {
                assert_eq!(expected, DRIVE_ROM_SIZE);
                assert_eq!(found, 100);
            }
            RomError::Io(_) => panic!("Expected BadLength"),
        }
    }
}
