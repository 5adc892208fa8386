// CPU Benchmarks
// Performance benchmarks for CPU instruction execution

use criterion::{criterion_group, criterion_main, Criterion};
use c64_rs::{new_shared_ram, C64Bus, Cpu};
use std::hint::black_box;

/// Fill RAM at $0400 with a looping program
fn load_loop(bus: &mut C64Bus, body: &[u8]) {
    let mut ram = bus.ram.borrow_mut();
    let mut address = 0x0400;
    for &byte in body {
        ram[address] = byte;
        address += 1;
    }
    // JMP $0400
    ram[address] = 0x4C;
    ram[address + 1] = 0x00;
    ram[address + 2] = 0x04;
}

/// Benchmark CPU instruction execution
/// Tests common instruction patterns to measure dispatch and execution
/// performance
fn bench_cpu_instructions(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_instructions");

    // Benchmark NOP instruction (simplest operation)
    group.bench_function("nop", |b| {
        let mut cpu = Cpu::new();
        let mut bus = C64Bus::new(new_shared_ram());
        load_loop(&mut bus, &[0xEA; 64]);
        cpu.pc = 0x0400;

        b.iter(|| {
            cpu.step(black_box(&mut bus));
        });
    });

    // Benchmark LDA immediate (common load operation)
    group.bench_function("lda_immediate", |b| {
        let mut cpu = Cpu::new();
        let mut bus = C64Bus::new(new_shared_ram());
        load_loop(&mut bus, &[0xA9, 0x42, 0xA9, 0x37]);
        cpu.pc = 0x0400;

        b.iter(|| {
            cpu.step(black_box(&mut bus));
        });
    });

    // Benchmark ADC immediate (arithmetic operation)
    group.bench_function("adc_immediate", |b| {
        let mut cpu = Cpu::new();
        let mut bus = C64Bus::new(new_shared_ram());
        load_loop(&mut bus, &[0x69, 0x01, 0x69, 0x01]);
        cpu.pc = 0x0400;

        b.iter(|| {
            cpu.step(black_box(&mut bus));
        });
    });

    // Benchmark STA absolute (memory write operation)
    group.bench_function("sta_absolute", |b| {
        let mut cpu = Cpu::new();
        let mut bus = C64Bus::new(new_shared_ram());
        load_loop(&mut bus, &[0x8D, 0x00, 0x02, 0x8D, 0x01, 0x02]);
        cpu.pc = 0x0400;

        b.iter(|| {
            cpu.step(black_box(&mut bus));
        });
    });

    // Benchmark indirect indexed addressing (most expensive mode)
    group.bench_function("lda_indirect_indexed", |b| {
        let mut cpu = Cpu::new();
        let mut bus = C64Bus::new(new_shared_ram());
        {
            let mut ram = bus.ram.borrow_mut();
            ram[0x40] = 0x00;
            ram[0x41] = 0x20;
        }
        load_loop(&mut bus, &[0xB1, 0x40, 0xB1, 0x40]);
        cpu.pc = 0x0400;
        cpu.y = 0x10;

        b.iter(|| {
            cpu.step(black_box(&mut bus));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_cpu_instructions);
criterion_main!(benches);
