//! VIC and sprite unit tests
//!
//! Covers the sprite DMA/serializer state machine (line read protocol,
//! expansion, pixel output, attribute-change policy) and the VIC
//! register window driving it.

use super::*;
use crate::memory::new_shared_ram;

/// Address used for sprite data blocks in these tests
pub(crate) const DATA_POINTER: u32 = 0x1000;

/// Build a sprite whose data block at [`DATA_POINTER`] starts with the
/// given bytes (the rest of the 63-byte block stays zero).
pub(crate) fn sprite_with_data(data: &[u8]) -> Sprite {
    let ram = new_shared_ram();
    {
        let mut mem = ram.borrow_mut();
        mem[DATA_POINTER as usize..DATA_POINTER as usize + data.len()].copy_from_slice(data);
    }
    let mut sprite = Sprite::new(ram);
    sprite.set_data_pointer(DATA_POINTER);
    sprite.init_painting();
    sprite
}

/// Drain `count` pixels from the serializer
pub(crate) fn drain(sprite: &mut Sprite, count: usize) -> Vec<u8> {
    (0..count).map(|_| sprite.get_next_pixel()).collect()
}

mod registers;
