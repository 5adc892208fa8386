//! VIC register window tests: attribute decode, raster readback and the
//! scanline update driving sprite DMA into the framebuffer.

use super::*;
use crate::io_chip::IoChip;

fn vic_with_ram() -> (Vic, crate::memory::SharedRam) {
    let ram = new_shared_ram();
    (Vic::new(ram.clone()), ram)
}

#[test]
fn test_sprite_coordinate_registers() {
    let (mut vic, _ram) = vic_with_ram();

    vic.write_register(0x00, 0x50); // sprite 0 X low
    vic.write_register(0x01, 0x64); // sprite 0 Y
    assert_eq!(vic.sprites[0].x(), 0x50);
    assert_eq!(vic.sprites[0].y(), 0x64);

    // X MSB register extends the coordinate past 255
    vic.write_register(0x10, 0x01);
    assert_eq!(vic.sprites[0].x(), 0x150);

    vic.write_register(0x10, 0x00);
    assert_eq!(vic.sprites[0].x(), 0x50);
}

#[test]
fn test_per_sprite_flag_registers() {
    let (mut vic, _ram) = vic_with_ram();

    vic.write_register(0x15, 0b1000_0001);
    assert!(vic.sprites[0].is_enabled());
    assert!(vic.sprites[7].is_enabled());
    assert!(!vic.sprites[3].is_enabled());

    vic.write_register(0x17, 0b0000_0010);
    assert!(vic.sprites[1].is_expand_y());

    vic.write_register(0x1B, 0b0000_0100);
    assert!(vic.sprites[2].has_priority());

    vic.write_register(0x1C, 0b0000_1000);
    assert!(vic.sprites[3].is_multicolor());

    vic.write_register(0x1D, 0b0001_0000);
    assert!(vic.sprites[4].is_expand_x());
}

#[test]
fn test_color_registers() {
    let (mut vic, _ram) = vic_with_ram();

    vic.write_register(0x27, 0x05); // sprite 0 color
    vic.write_register(0x2E, 0x0B); // sprite 7 color
    assert_eq!(vic.sprites[0].color(2), 5);
    assert_eq!(vic.sprites[7].color(2), 11);

    // Shared multicolor registers feed palette slots 1 and 3 of every
    // sprite
    vic.write_register(0x25, 0x03);
    vic.write_register(0x26, 0x0E);
    for sprite in &vic.sprites {
        assert_eq!(sprite.color(1), 3);
        assert_eq!(sprite.color(3), 14);
    }
}

#[test]
fn test_raster_readback() {
    let (mut vic, _ram) = vic_with_ram();
    assert_eq!(vic.read_register(0x12), 0);

    // 100 scanlines worth of cycles
    vic.update(CYCLES_PER_LINE * 100);
    assert_eq!(vic.raster_line(), 100);
    assert_eq!(vic.read_register(0x12), 100);
    assert_eq!(vic.read_register(0x11) & 0x80, 0);

    // Past line 255 the ninth bit shows up in control register 1
    vic.update(CYCLES_PER_LINE * 300);
    assert_eq!(vic.raster_line(), 300);
    assert_eq!(vic.read_register(0x12), (300u16 & 0xFF) as u8);
    assert_eq!(vic.read_register(0x11) & 0x80, 0x80);
}

#[test]
fn test_frame_wrap_resets_sprites() {
    let (mut vic, _ram) = vic_with_ram();
    assert_eq!(vic.frame(), 0);

    vic.update(CYCLES_PER_LINE * u64::from(LINES_PER_FRAME));
    assert_eq!(vic.frame(), 1);
    assert_eq!(vic.raster_line(), 0);
}

#[test]
fn test_next_update_is_the_scanline_boundary() {
    let (mut vic, _ram) = vic_with_ram();
    assert_eq!(vic.next_update(), CYCLES_PER_LINE);

    vic.update(10);
    assert_eq!(vic.next_update(), CYCLES_PER_LINE);

    vic.update(CYCLES_PER_LINE + 5);
    assert_eq!(vic.next_update(), CYCLES_PER_LINE * 2);
}

#[test]
fn test_sprite_dma_paints_into_framebuffer() {
    let (mut vic, ram) = vic_with_ram();

    // Sprite pointer table sits at screen base + $3F8; slot 0 -> block 13
    {
        let mut mem = ram.borrow_mut();
        mem[0x03F8] = 13;
        let base = 13 * 64;
        mem[base] = 0xFF; // first 8 pixels of the first line set
    }

    vic.write_register(0x00, 50); // X = 50 -> column 26
    vic.write_register(0x01, 60); // Y = 60 -> row 9
    vic.write_register(0x27, 0x05); // color 5
    vic.write_register(0x15, 0x01); // enable sprite 0

    // Run past raster line 60
    vic.update(CYCLES_PER_LINE * 62);

    let row = 60 - 51;
    let col = 50 - 24;
    for i in 0..8 {
        assert_eq!(
            vic.framebuffer()[row * DISPLAY_WIDTH + col + i],
            5,
            "Pixel {} of the first sprite line",
            i
        );
    }
    assert_eq!(
        vic.framebuffer()[row * DISPLAY_WIDTH + col + 8],
        0,
        "Ninth pixel is transparent"
    );
}

#[test]
fn test_lower_numbered_sprite_wins_overlap() {
    let (mut vic, ram) = vic_with_ram();

    {
        let mut mem = ram.borrow_mut();
        mem[0x03F8] = 13;
        mem[0x03F9] = 14;
        mem[13 * 64] = 0xFF;
        mem[14 * 64] = 0xFF;
    }

    // Both sprites at the same spot, different colors
    for n in 0..2u8 {
        vic.write_register(n * 2, 50);
        vic.write_register(n * 2 + 1, 60);
        vic.write_register(0x27 + n, n + 1);
    }
    vic.write_register(0x15, 0x03);

    vic.update(CYCLES_PER_LINE * 62);

    let row = 60 - 51;
    let col = 50 - 24;
    assert_eq!(
        vic.framebuffer()[row * DISPLAY_WIDTH + col],
        1,
        "Sprite 0 is composited in front of sprite 1"
    );
}

#[test]
fn test_painting_stops_past_last_byte() {
    let (mut vic, ram) = vic_with_ram();

    {
        let mut mem = ram.borrow_mut();
        mem[0x03F8] = 13;
    }
    vic.write_register(0x01, 60);
    vic.write_register(0x15, 0x01);

    // 21 data lines end the band: 60 + 21 lines, some margin after
    vic.update(CYCLES_PER_LINE * 90);
    assert!(!vic.sprites[0].is_painting(), "Band ended after 63 bytes");
}

#[test]
fn test_reset_clears_registers_and_raster() {
    let (mut vic, _ram) = vic_with_ram();
    vic.write_register(0x15, 0xFF);
    vic.update(CYCLES_PER_LINE * 10);

    vic.reset();
    assert_eq!(vic.raster_line(), 0);
    assert_eq!(vic.read_register(0x15), 0);
    assert!(!vic.sprites[0].is_enabled());
}

#[test]
fn test_vic_snapshot_roundtrip() {
    use crate::emulator::snapshot::{SnapshotReader, SnapshotWriter};

    let (mut vic, _ram) = vic_with_ram();
    vic.write_register(0x15, 0x21);
    vic.write_register(0x27, 0x07);
    vic.update(CYCLES_PER_LINE * 5);

    let mut w = SnapshotWriter::new();
    vic.save_state(&mut w);
    let bytes = w.into_bytes();

    let (mut restored, _ram2) = vic_with_ram();
    let mut r = SnapshotReader::new(&bytes);
    restored.restore_state(&mut r).unwrap();

    assert_eq!(restored.raster_line(), 5);
    assert_eq!(restored.read_register(0x15), 0x21);
    assert!(restored.sprites[0].is_enabled());
    assert_eq!(restored.sprites[0].color(2), 7);
}
