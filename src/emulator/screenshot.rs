// Screenshot functionality
//
// Captures the VIC index framebuffer and saves it as a PNG file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::vic::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// The 16 fixed C64 colors as 0xRRGGBB
pub static C64_PALETTE: [u32; 16] = [
    0x000000, // black
    0xFFFFFF, // white
    0x68372B, // red
    0x70A4B2, // cyan
    0x6F3D86, // purple
    0x588D43, // green
    0x352879, // blue
    0xB8C76F, // yellow
    0x6F4F25, // orange
    0x433900, // brown
    0x9A6759, // light red
    0x444444, // dark grey
    0x6C6C6C, // grey
    0x9AD284, // light green
    0x6C5EB5, // light blue
    0x959595, // light grey
];

/// Errors that can occur during screenshot operations
#[derive(Debug)]
pub enum ScreenshotError {
    /// I/O error
    Io(io::Error),

    /// PNG encoding error
    PngEncoding(png::EncodingError),
}

impl std::fmt::Display for ScreenshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenshotError::Io(e) => write!(f, "I/O error: {}", e),
            ScreenshotError::PngEncoding(e) => write!(f, "PNG encoding error: {}", e),
        }
    }
}

impl std::error::Error for ScreenshotError {}

impl From<io::Error> for ScreenshotError {
    fn from(e: io::Error) -> Self {
        ScreenshotError::Io(e)
    }
}

impl From<png::EncodingError> for ScreenshotError {
    fn from(e: png::EncodingError) -> Self {
        ScreenshotError::PngEncoding(e)
    }
}

/// Save a screenshot of the current frame.
///
/// Converts the VIC framebuffer (320x200 palette indices) to RGB and
/// writes a timestamped PNG into `directory`.
pub fn save_screenshot(
    frame_buffer: &[u8],
    directory: &Path,
) -> Result<PathBuf, ScreenshotError> {
    fs::create_dir_all(directory)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("screenshot_{}.png", timestamp);
    let file_path = directory.join(filename);

    let rgb_data = palette_indices_to_rgb(frame_buffer);
    save_png(
        &file_path,
        &rgb_data,
        DISPLAY_WIDTH as u32,
        DISPLAY_HEIGHT as u32,
    )?;

    Ok(file_path)
}

/// Convert palette indices to RGB888 data
fn palette_indices_to_rgb(palette_indices: &[u8]) -> Vec<u8> {
    let mut rgb_data = Vec::with_capacity(palette_indices.len() * 3);

    for &index in palette_indices {
        let color = C64_PALETTE[index as usize % C64_PALETTE.len()];
        rgb_data.push(((color >> 16) & 0xFF) as u8); // R
        rgb_data.push(((color >> 8) & 0xFF) as u8); // G
        rgb_data.push((color & 0xFF) as u8); // B
    }

    rgb_data
}

/// Save RGB data as a PNG file
fn save_png(path: &Path, data: &[u8], width: u32, height: u32) -> Result<(), ScreenshotError> {
    let file = fs::File::create(path)?;
    let w = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_indices_to_rgb() {
        let indices = vec![0, 1];
        let rgb = palette_indices_to_rgb(&indices);

        assert_eq!(rgb.len(), 6);
        assert_eq!(&rgb[0..3], &[0x00, 0x00, 0x00], "Index 0 is black");
        assert_eq!(&rgb[3..6], &[0xFF, 0xFF, 0xFF], "Index 1 is white");
    }

    #[test]
    fn test_out_of_range_index_wraps() {
        let rgb = palette_indices_to_rgb(&[16]);
        assert_eq!(&rgb[0..3], &[0x00, 0x00, 0x00], "16 wraps to black");
    }

    #[test]
    fn test_save_screenshot_writes_png() {
        let dir = std::env::temp_dir().join("c64rs-screenshot-test");
        let frame = vec![1u8; DISPLAY_WIDTH * DISPLAY_HEIGHT];

        let path = save_screenshot(&frame, &dir).unwrap();
        let data = fs::read(&path).unwrap();
        assert_eq!(&data[1..4], b"PNG");

        fs::remove_file(&path).ok();
    }
}
