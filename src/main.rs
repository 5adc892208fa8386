// C64 Emulator - Headless Entry Point
//
// Runs the core without any display shell: loads the floppy ROM (and
// optionally a program image into C64 RAM), runs a bounded number of
// frames and prints a summary. Useful for exercising the drive boot
// path and the sprite pipeline from the command line.

use std::process::ExitCode;

use c64_rs::{Emulator, EmulatorConfig, LogLevel, MemoryDisk};

struct Args {
    rom_path: Option<String>,
    program_path: Option<String>,
    frames: u64,
    trace: bool,
    screenshot: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        rom_path: None,
        program_path: None,
        frames: 50,
        trace: false,
        screenshot: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--rom" => args.rom_path = Some(iter.next().ok_or("--rom needs a path")?),
            "--program" => {
                args.program_path = Some(iter.next().ok_or("--program needs a path")?)
            }
            "--frames" => {
                let value = iter.next().ok_or("--frames needs a number")?;
                args.frames = value.parse().map_err(|_| "--frames needs a number")?;
            }
            "--trace" => args.trace = true,
            "--screenshot" => args.screenshot = true,
            "--help" | "-h" => {
                return Err(String::new());
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }
    Ok(args)
}

fn usage() {
    println!("C64 Emulator (c64-rs) v0.1.0");
    println!();
    println!("Usage: c64-rs [options]");
    println!("  --rom <path>        16KB 1541 floppy ROM image");
    println!("  --program <path>    raw program loaded at $0400");
    println!("  --frames <n>        frames to run (default 50)");
    println!("  --trace             print the execution trace");
    println!("  --screenshot        save a PNG of the final frame");
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("{}", message);
            }
            usage();
            return ExitCode::FAILURE;
        }
    };

    let mut emulator = Emulator::with_config(EmulatorConfig::load_or_default());
    emulator.logger_mut().set_log_level(LogLevel::Info);

    if let Some(rom_path) = &args.rom_path {
        if let Err(e) = emulator.load_floppy_rom_file(rom_path) {
            eprintln!("Failed to load floppy ROM: {}", e);
            return ExitCode::FAILURE;
        }
        emulator.attach_disk(Box::new(MemoryDisk::new()), None);
        println!("Drive ready ({})", rom_path);
    }

    if let Some(program_path) = &args.program_path {
        match std::fs::read(program_path) {
            Ok(program) => {
                emulator.load_program(0x0400, &program);
                println!("Program loaded at $0400 ({} bytes)", program.len());
            }
            Err(e) => {
                eprintln!("Failed to load program: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    if args.trace {
        emulator.logger_mut().set_log_level(LogLevel::Trace);
        emulator.logger_mut().enable_cpu_trace();
        emulator.logger_mut().enable_drive_trace();
    }

    for frame in 0..args.frames {
        if let Err(e) = emulator.run_frame() {
            eprintln!("Emulation aborted in frame {}: {}", frame, e);
            return ExitCode::FAILURE;
        }
    }

    println!(
        "Ran {} frames, {} CPU cycles, drive {}",
        args.frames,
        emulator.cpu().cycles,
        if emulator.drive().is_running() {
            "running"
        } else {
            "stopped"
        }
    );

    if args.trace {
        print!("{}", emulator.logger().format_trace_buffer());
    }

    if args.screenshot {
        match emulator.screenshot() {
            Ok(path) => println!("Screenshot saved to {}", path.display()),
            Err(e) => eprintln!("Screenshot failed: {}", e),
        }
    }

    ExitCode::SUCCESS
}
