//! TRS-80 Model III emulator binary.
//!
//! Runs one VM wired to stdin/stdout: newline-delimited JSON commands in,
//! JSON arrays of updates out, flushed every ~10 ms with runs of
//! consecutive screen pokes merged into one record.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use emu_trs80::{Machine, VmCommand, VmUpdate};

/// How often queued updates are flushed to stdout.
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

struct CliArgs {
    rom_path: PathBuf,
    disk_paths: Vec<PathBuf>,
    cassette_path: Option<PathBuf>,
    boot: bool,
    no_pacing: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        rom_path: PathBuf::from("roms/model3.rom"),
        disk_paths: Vec::new(),
        cassette_path: None,
        boot: false,
        no_pacing: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rom" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.rom_path = PathBuf::from(s);
                }
            }
            "--cassette" => {
                i += 1;
                cli.cassette_path = args.get(i).map(PathBuf::from);
            }
            "--boot" => {
                cli.boot = true;
            }
            "--no-pacing" => {
                cli.no_pacing = true;
            }
            "--help" | "-h" => {
                eprintln!("Usage: trs80 [OPTIONS] [DISK0 [DISK1]]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --rom <file>       ROM file [default: roms/model3.rom]");
                eprintln!("  --cassette <file>  Mount a WAV file as the cassette");
                eprintln!("  --boot             Boot immediately instead of waiting for a command");
                eprintln!("  --no-pacing        Run at full speed instead of real time");
                eprintln!();
                eprintln!("Commands are read from stdin as JSON records like");
                eprintln!("  {{\"Cmd\":\"boot\"}} or {{\"Cmd\":\"press\",\"Data\":\"A\"}};");
                eprintln!("updates are written to stdout as JSON arrays.");
                process::exit(0);
            }
            other if !other.starts_with('-') => {
                cli.disk_paths.push(PathBuf::from(other));
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Read JSON commands from stdin and forward them to the VM. A closed
/// stdin shuts the VM down.
fn read_commands(tx: &Sender<VmCommand>) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<VmCommand>(line) {
            Ok(command) => {
                if tx.send(command).is_err() {
                    return;
                }
            }
            Err(e) => eprintln!("bad command: {e}"),
        }
    }

    let _ = tx.send(VmCommand {
        cmd: "shutdown".to_string(),
        addr: 0,
        data: String::new(),
    });
}

/// Batch updates and write them to stdout as JSON arrays, merging runs of
/// pokes to consecutive screen addresses into one record.
fn flush_updates(rx: &Receiver<VmUpdate>) {
    let mut pending: Vec<VmUpdate> = Vec::new();
    let mut deadline = Instant::now() + FLUSH_INTERVAL;

    loop {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(timeout) {
            Ok(update) => {
                let is_shutdown = update.cmd == "shutdown";
                pending.push(update);
                if is_shutdown {
                    flush(&mut pending);
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                flush(&mut pending);
                deadline = Instant::now() + FLUSH_INTERVAL;
            }
            Err(RecvTimeoutError::Disconnected) => {
                flush(&mut pending);
                return;
            }
        }
    }
}

fn flush(pending: &mut Vec<VmUpdate>) {
    if pending.is_empty() {
        return;
    }

    let merged = merge_pokes(pending.drain(..));
    match serde_json::to_string(&merged) {
        Ok(json) => {
            println!("{json}");
            let _ = io::stdout().flush();
        }
        Err(e) => eprintln!("can't serialize updates: {e}"),
    }
}

/// Turn per-byte pokes into per-run pokes with a string payload. Other
/// updates pass through in order.
fn merge_pokes(updates: impl Iterator<Item = VmUpdate>) -> Vec<VmUpdate> {
    let mut merged: Vec<VmUpdate> = Vec::new();

    for update in updates {
        if update.cmd == "poke" {
            if let (Some(addr), Some(data)) = (update.addr, update.data) {
                let ch = char::from(data as u8);
                if let Some(last) = merged.last_mut() {
                    if last.cmd == "poke" {
                        if let (Some(last_addr), Some(msg)) = (last.addr, last.msg.as_mut()) {
                            if last_addr + msg.chars().count() as i32 == addr {
                                msg.push(ch);
                                continue;
                            }
                        }
                    }
                }
                merged.push(VmUpdate {
                    cmd: "poke".to_string(),
                    addr: Some(addr),
                    data: None,
                    msg: Some(ch.to_string()),
                });
                continue;
            }
        }
        merged.push(update);
    }

    merged
}

fn main() {
    let cli = parse_args();

    let rom = match std::fs::read(&cli.rom_path) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("Failed to read ROM file {}: {e}", cli.rom_path.display());
            process::exit(1);
        }
    };
    eprintln!("ROM has {} bytes", rom.len());

    let (command_tx, command_rx) = mpsc::channel();
    let (update_tx, update_rx) = mpsc::channel();

    let mut machine = Machine::new(&rom, Some(update_tx));
    if cli.no_pacing {
        machine.set_pacing(false);
    }

    for (drive, path) in cli.disk_paths.iter().enumerate().take(2) {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Failed to read disk {}: {e}", path.display());
                process::exit(1);
            }
        };
        if let Err(e) = machine.load_disk(drive, data) {
            eprintln!("Failed to load disk {}: {e}", path.display());
            process::exit(1);
        }
        eprintln!("Loaded disk {} into drive {drive}", path.display());
    }

    if let Some(path) = cli.cassette_path {
        machine.set_cassette_file(path);
    }

    if cli.boot {
        let _ = command_tx.send(VmCommand {
            cmd: "boot".to_string(),
            addr: 0,
            data: String::new(),
        });
    }

    let reader = thread::spawn(move || read_commands(&command_tx));
    let flusher = thread::spawn(move || flush_updates(&update_rx));

    machine.run(&command_rx);

    // The machine closed the update channel; wait for the last flush.
    let _ = flusher.join();
    drop(reader);
}
