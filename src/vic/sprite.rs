// Sprite state machine - DMA line fetch, expansion and pixel serializer
//
// Each of the eight hardware sprites is an independent state machine.
// Per raster band the VIC arms it with `init_painting`, then feeds it one
// `read_line_data` per scanline (three bytes of DMA into a 24-bit shift
// register) and drains pixels with `get_next_pixel`. Y-expansion is
// implemented by reading each source line twice; X-expansion by draining
// each bit twice. The sprite shares the machine's memory through a
// read-only view; its own state is private to the sprite.

use crate::emulator::snapshot::{SnapshotError, SnapshotReader, SnapshotWriter};
use crate::memory::SharedRam;

/// Bytes of pixel data per sprite (21 lines of 3 bytes)
pub const SPRITE_DATA_SIZE: u16 = 63;

/// Bits serialized per line without X-expansion
const BITS_PER_LINE: u8 = 24;

/// Bits serialized per line with X-expansion (each bit twice)
const BITS_PER_LINE_EXPANDED: u8 = 48;

/// One hardware sprite
pub struct Sprite {
    /// Read-only view of the shared machine memory for DMA fetches
    memory: SharedRam,

    // Visible attributes
    x: u16,
    y: u8,
    enabled: bool,
    multicolor: bool,
    expand_x: bool,
    expand_y: bool,
    priority: bool,

    /// Palette for this sprite: index 0 is transparent, 1 and 3 are the
    /// shared multicolor registers, 2 is the sprite's own color.
    colors: [u8; 4],

    // DMA state
    painting: bool,
    pointer: u32,
    last_pointer: u32,
    line_data: u32,
    bit_read: u8,
    next_byte: u16,
    first_y_read: bool,

    /// Raised when a visible attribute changed while the sprite is
    /// enabled; the text renderer drops its character cache on it.
    needs_char_cache_refresh: bool,
}

impl Sprite {
    /// Create a sprite bound to the shared memory view
    pub fn new(memory: SharedRam) -> Self {
        Sprite {
            memory,
            x: 0,
            y: 0,
            enabled: false,
            multicolor: false,
            expand_x: false,
            expand_y: false,
            priority: false,
            colors: [0; 4],
            painting: false,
            pointer: 0,
            last_pointer: 0,
            line_data: 0,
            bit_read: 0,
            next_byte: 0,
            first_y_read: false,
            needs_char_cache_refresh: false,
        }
    }

    // ========================================
    // Attribute setters
    //
    // Policy: changing x, y, enabled, priority, expandX or expandY on an
    // enabled sprite invalidates the character cache. Multicolor and the
    // palette never do. Only expandX mutates serializer state mid-line.
    // ========================================

    fn flag_attribute_change(&mut self) {
        if self.enabled {
            self.needs_char_cache_refresh = true;
        }
    }

    pub fn set_x(&mut self, x: u16) {
        if self.x != x {
            self.x = x;
            self.flag_attribute_change();
        }
    }

    pub fn set_y(&mut self, y: u8) {
        if self.y != y {
            self.y = y;
            self.flag_attribute_change();
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.needs_char_cache_refresh = true;
        }
    }

    pub fn set_multicolor(&mut self, multicolor: bool) {
        self.multicolor = multicolor;
    }

    /// Toggling X-expansion mid-line doubles or halves the remaining
    /// bit count so the pixel serializer keeps its place.
    pub fn set_expand_x(&mut self, expand_x: bool) {
        if self.expand_x == expand_x {
            return;
        }
        self.expand_x = expand_x;
        if expand_x {
            self.bit_read = self.bit_read.saturating_mul(2);
        } else {
            self.bit_read /= 2;
        }
        self.flag_attribute_change();
    }

    pub fn set_expand_y(&mut self, expand_y: bool) {
        if self.expand_y != expand_y {
            self.expand_y = expand_y;
            self.flag_attribute_change();
        }
    }

    pub fn set_priority(&mut self, priority: bool) {
        if self.priority != priority {
            self.priority = priority;
            self.flag_attribute_change();
        }
    }

    pub fn set_color(&mut self, index: usize, color: u8) {
        self.colors[index & 3] = color;
    }

    /// Point the sprite at its 63-byte data block in shared memory
    pub fn set_data_pointer(&mut self, pointer: u32) {
        self.pointer = pointer;
    }

    // ========================================
    // Queries
    // ========================================

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_multicolor(&self) -> bool {
        self.multicolor
    }

    pub fn is_expand_x(&self) -> bool {
        self.expand_x
    }

    pub fn is_expand_y(&self) -> bool {
        self.expand_y
    }

    pub fn has_priority(&self) -> bool {
        self.priority
    }

    pub fn color(&self, index: usize) -> u8 {
        self.colors[index & 3]
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    /// All 24 (or 48) pixels of the current line have been drained
    pub fn is_line_finished(&self) -> bool {
        self.bit_read == 0
    }

    /// The DMA pointer ran past the 63-byte data block; no further
    /// fetches happen this frame.
    pub fn is_beyond_last_byte(&self) -> bool {
        self.next_byte >= SPRITE_DATA_SIZE
    }

    pub fn needs_char_cache_refresh(&self) -> bool {
        self.needs_char_cache_refresh
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Frame start: clear the per-frame DMA state
    pub fn init_update(&mut self) {
        self.next_byte = 0;
        self.line_data = 0;
        self.set_painting(false);
    }

    /// First visible line of a raster band: arm the DMA
    pub fn init_painting(&mut self) {
        self.next_byte = 0;
        self.painting = true;
        self.first_y_read = true;
    }

    /// End or begin the raster band. The char-cache signal is cleared
    /// only on the transition out of painting.
    pub fn set_painting(&mut self, painting: bool) {
        if self.painting && !painting {
            self.needs_char_cache_refresh = false;
        }
        self.painting = painting;
    }

    /// Fetch three bytes of sprite data for the current scanline.
    ///
    /// With Y-expansion on, the data pointer advances only every second
    /// call so the serializer sees each source line twice.
    pub fn read_line_data(&mut self) {
        let mem = self.memory.borrow();
        let mask = mem.len() - 1;
        let base = (self.pointer + u32::from(self.next_byte)) as usize;

        let b0 = u32::from(mem[base & mask]);
        let b1 = u32::from(mem[(base + 1) & mask]);
        let b2 = u32::from(mem[(base + 2) & mask]);
        drop(mem);
        self.line_data = (b0 << 16) | (b1 << 8) | b2;

        if !self.expand_y {
            self.next_byte += 3;
        } else {
            if !self.first_y_read {
                self.next_byte += 3;
            }
            self.first_y_read = !self.first_y_read;
        }

        if self.pointer != self.last_pointer {
            self.needs_char_cache_refresh = true;
            self.last_pointer = self.pointer;
        }

        self.bit_read = if self.expand_x {
            BITS_PER_LINE_EXPANDED
        } else {
            BITS_PER_LINE
        };
    }

    /// Serialize the next pixel of the current line.
    ///
    /// Returns a color index 0-3; 0 is transparent. Single-color sprites
    /// produce only 0 or 2, so the background index doubles as
    /// transparency. Past the end of the line the serializer returns 0.
    pub fn get_next_pixel(&mut self) -> u8 {
        if self.is_line_finished() {
            return 0;
        }

        self.bit_read -= 1;
        let shift = if self.expand_x {
            self.bit_read >> 1
        } else {
            self.bit_read
        };

        if self.multicolor {
            // Bit pairs: adjacent pixels share an index until the pair
            // boundary passes.
            ((self.line_data >> (shift & !1)) & 3) as u8
        } else {
            (((self.line_data >> shift) & 1) << 1) as u8
        }
    }

    // ========================================
    // Serialization
    // ========================================

    /// Field order is part of the snapshot format: x, y, priority,
    /// enabled, expandX, expandY, firstYRead, multicolor, painting,
    /// needsCharCacheRefresh, colors[], bitRead, lastPointer, lineData,
    /// nextByte, pointer.
    pub fn save_state(&self, w: &mut SnapshotWriter) {
        w.write_u32(u32::from(self.x));
        w.write_u32(u32::from(self.y));
        w.write_bool(self.priority);
        w.write_bool(self.enabled);
        w.write_bool(self.expand_x);
        w.write_bool(self.expand_y);
        w.write_bool(self.first_y_read);
        w.write_bool(self.multicolor);
        w.write_bool(self.painting);
        w.write_bool(self.needs_char_cache_refresh);
        w.write_u32(self.colors.len() as u32);
        for &color in &self.colors {
            w.write_u32(u32::from(color));
        }
        w.write_u32(u32::from(self.bit_read));
        w.write_u32(self.last_pointer);
        w.write_u32(self.line_data);
        w.write_u32(u32::from(self.next_byte));
        w.write_u32(self.pointer);
    }

    /// Restore state written by [`save_state`](Self::save_state)
    pub fn restore_state(&mut self, r: &mut SnapshotReader) -> Result<(), SnapshotError> {
        self.x = r.read_u32()? as u16;
        self.y = r.read_u32()? as u8;
        self.priority = r.read_bool()?;
        self.enabled = r.read_bool()?;
        self.expand_x = r.read_bool()?;
        self.expand_y = r.read_bool()?;
        self.first_y_read = r.read_bool()?;
        self.multicolor = r.read_bool()?;
        self.painting = r.read_bool()?;
        self.needs_char_cache_refresh = r.read_bool()?;
        let count = r.read_u32()? as usize;
        if count != self.colors.len() {
            return Err(SnapshotError::InvalidValue(format!(
                "sprite palette length {} (expected {})",
                count,
                self.colors.len()
            )));
        }
        for i in 0..count {
            self.colors[i] = r.read_u32()? as u8;
        }
        self.bit_read = r.read_u32()? as u8;
        self.last_pointer = r.read_u32()?;
        self.line_data = r.read_u32()?;
        self.next_byte = r.read_u32()? as u16;
        self.pointer = r.read_u32()?;
        Ok(())
    }
}
