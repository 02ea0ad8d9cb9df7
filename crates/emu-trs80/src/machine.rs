//! The Model III machine: CPU plus bus, the VM run loop, real-time
//! pacing, and the 30 Hz timer.
//!
//! The machine is a single owned aggregate parameterized by a command
//! receiver and an update sender, so several can run independently in one
//! process. The run loop alternates between draining commands and stepping
//! instructions; each step dispatches due events, services NMI then IRQ,
//! advances the clock, paces against wall time, and feeds the cassette.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use cpu_z80::Z80;
use emu_core::Cpu;

use crate::bus::TrsBus;
use crate::update::{VmCommand, VmUpdate};

/// Z80 T-states per second on the Model III.
pub const CPU_HZ: u64 = 2_027_520;

/// Nanoseconds per T-state.
pub const CPU_PERIOD_NS: u64 = 1_000_000_000 / CPU_HZ;

/// The heartbeat timer interrupts at 30 Hz; the ROM uses it for things
/// like blinking the cursor.
pub const TIMER_HZ: u64 = 30;
pub const TIMER_CYCLES: u64 = CPU_HZ / TIMER_HZ;

/// How often (in cycles) to compare the virtual clock against wall time.
const ADJUST_WINDOW_CYCLES: u64 = 1000;

/// Once-per-second throughput diagnostic.
const DUMP_THROUGHPUT: bool = false;

/// A stop request at a program counter.
#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub pc: u16,
    pub active: bool,
}

/// The whole machine.
pub struct Machine {
    pub cpu: Z80,
    pub bus: TrsBus,

    breakpoints: Vec<Breakpoint>,

    /// Per-instruction trace logging, toggled by the `tron` command.
    trace: bool,
    /// Whether `boot` has run yet; a later `boot` just resumes.
    booted: bool,
    /// Whether to slow the virtual clock down to real time.
    pacing: bool,

    // Pacing anchors.
    start_time: Instant,
    start_clock: u64,
    previous_adjust_clock: u64,
    previous_timer_clock: u64,

    // Throughput diagnostic state.
    previous_dump_time: Instant,
    previous_dump_clock: u64,
    slept_since_dump: Duration,
}

impl Machine {
    #[must_use]
    pub fn new(rom: &[u8], update_tx: Option<std::sync::mpsc::Sender<VmUpdate>>) -> Self {
        Self {
            cpu: Z80::new(),
            bus: TrsBus::new(rom, update_tx),
            breakpoints: Vec::new(),
            trace: false,
            booted: false,
            pacing: true,
            start_time: Instant::now(),
            start_clock: 0,
            previous_adjust_clock: 0,
            previous_timer_clock: 0,
            previous_dump_time: Instant::now(),
            previous_dump_clock: 0,
            slept_since_dump: Duration::ZERO,
        }
    }

    /// Turn real-time pacing off (tests and batch runs want full speed).
    pub fn set_pacing(&mut self, pacing: bool) {
        self.pacing = pacing;
    }

    /// Insert a disk image into a drive.
    pub fn load_disk(&mut self, drive: usize, data: Vec<u8>) -> Result<(), String> {
        self.bus.load_disk(drive, data)
    }

    /// Mount a WAV file as the cassette. It is opened when the motor
    /// turns on.
    pub fn set_cassette_file(&mut self, path: PathBuf) {
        self.bus.cassette.filename = Some(path);
    }

    pub fn add_breakpoint(&mut self, pc: u16) {
        self.breakpoints.push(Breakpoint { pc, active: true });
    }

    fn at_breakpoint(&self, pc: u16) -> bool {
        // Linear is fine; there are never many of these.
        self.breakpoints.iter().any(|bp| bp.active && bp.pc == pc)
    }

    /// Reset the machine. A power-on reset also clears the CPU registers
    /// and pulls the drive heads to track 0; a soft reset instead presses
    /// the reset button (an NMI).
    pub fn reset(&mut self, power_on: bool) {
        self.bus.reset_cassette();
        self.bus.disk_init(power_on);
        self.bus.interrupts.set_irq_mask(0);
        self.bus.interrupts.set_nmi_mask(0);
        self.bus.keyboard.clear();
        self.bus.interrupts.timer_interrupt(false);

        if power_on {
            self.cpu.power_on_reset();
            self.anchor_pacing();
        } else {
            self.bus.interrupts.reset_button_interrupt(true);
        }
    }

    /// Re-anchor the pacing clock at the current moment, so time stopped
    /// (or never started) doesn't turn into a sleep or a sprint.
    fn anchor_pacing(&mut self) {
        self.start_time = Instant::now();
        self.start_clock = self.bus.clock;
        self.previous_adjust_clock = self.bus.clock;
    }

    /// Execute one instruction and all its per-step bookkeeping.
    pub fn step(&mut self) -> Result<(), String> {
        if self.trace {
            let pc = self.cpu.regs.pc;
            let clock = self.bus.clock;
            if let Some(name) = rom_routine(pc) {
                eprintln!("{name}");
            }
            let (line, _) = self.cpu.disassemble(&mut self.bus, pc);
            eprintln!("{clock:10} {line}");
        }

        let cycles = self.cpu.step_instruction(&mut self.bus)?;

        // Dispatch scheduled events.
        self.bus.dispatch_events();

        // Handle non-maskable interrupts.
        if self.bus.interrupts.nmi_pending() {
            self.cpu.nmi(&mut self.bus);
            self.bus.interrupts.set_nmi_seen();

            // Simulate the reset button being released.
            self.bus.interrupts.reset_button_interrupt(false);
        }

        // Handle maskable interrupts. An EI in the instruction just
        // executed holds the IRQ off for one more instruction.
        if self.bus.interrupts.irq_pending()
            && self.cpu.regs.iff1
            && !self.cpu.irq_suppressed()
        {
            self.cpu.interrupt(&mut self.bus);
        }

        self.bus.clock += u64::from(cycles);

        if DUMP_THROUGHPUT && self.bus.clock > self.previous_dump_clock + CPU_HZ {
            self.dump_throughput();
        }

        // Slow down if we're ahead of real time; yield if behind so
        // command senders get a chance to run.
        if self.pacing && self.bus.clock > self.previous_adjust_clock + ADJUST_WINDOW_CYCLES {
            let elapsed_real = self.start_time.elapsed();
            let elapsed_virtual =
                Duration::from_nanos((self.bus.clock - self.start_clock) * CPU_PERIOD_NS);
            if elapsed_virtual > elapsed_real {
                let ahead = elapsed_virtual - elapsed_real;
                thread::sleep(ahead);
                self.slept_since_dump += ahead;
            } else {
                thread::yield_now();
            }
            self.previous_adjust_clock = self.bus.clock;
        }

        // Set off a timer interrupt.
        if self.bus.clock > self.previous_timer_clock + TIMER_CYCLES {
            self.bus.handle_timer();
            self.previous_timer_clock = self.bus.clock;
        }

        // Update cassette state.
        self.bus.update_cassette();

        if let Some(message) = self.bus.take_fatal() {
            return Err(message);
        }

        Ok(())
    }

    fn dump_throughput(&mut self) {
        let now = Instant::now();
        if self.previous_dump_clock > 0 {
            let elapsed = now.duration_since(self.previous_dump_time).as_secs_f64();
            #[allow(clippy::cast_precision_loss)]
            let computer_time = (self.bus.clock - self.previous_dump_clock) as f64 / CPU_HZ as f64;
            eprintln!(
                "computer time: {computer_time:.1}s, elapsed: {elapsed:.1}s, mult: {:.1}, slept: {}ms",
                computer_time / elapsed,
                self.slept_since_dump.as_millis()
            );
            self.slept_since_dump = Duration::ZERO;
        }
        self.previous_dump_time = now;
        self.previous_dump_clock = self.bus.clock;
    }

    /// Log the last instructions we executed, disassembled.
    pub fn log_historical_pcs(&mut self) {
        for pc in self.cpu.history() {
            let (line, _) = self.cpu.disassemble(&mut self.bus, pc);
            eprintln!("{line}");
        }
    }

    /// The VM loop: consume commands and step while running. Returns when
    /// shut down, after emitting a final shutdown update.
    pub fn run(&mut self, command_rx: &Receiver<VmCommand>) {
        let mut running = false;
        let mut shutdown = false;
        // Set when resuming from a stop so the breakpoint we stopped at
        // doesn't immediately re-fire.
        let mut skip_breakpoint_check = false;

        while !shutdown {
            if running {
                match command_rx.try_recv() {
                    Ok(command) => {
                        self.handle_command(&command, &mut running, &mut shutdown);
                    }
                    Err(TryRecvError::Empty) => {
                        let pc = self.cpu.regs.pc;
                        if !skip_breakpoint_check && self.at_breakpoint(pc) {
                            self.bus.send_update(VmUpdate::breakpoint(pc));
                            eprintln!("breakpoint at {pc:04X}");
                            self.log_historical_pcs();
                            running = false;
                        } else {
                            skip_breakpoint_check = false;
                            if let Err(message) = self.step() {
                                eprintln!("fatal: {message}");
                                self.log_historical_pcs();
                                self.bus
                                    .send_update(VmUpdate::message(&format!("fatal: {message}")));
                                shutdown = true;
                            }
                        }
                    }
                    Err(TryRecvError::Disconnected) => shutdown = true,
                }
            } else {
                match command_rx.recv() {
                    Ok(command) => {
                        let was_running = running;
                        self.handle_command(&command, &mut running, &mut shutdown);
                        if running && !was_running {
                            skip_breakpoint_check = true;
                            self.anchor_pacing();
                        }
                    }
                    Err(_) => shutdown = true,
                }
            }
        }

        eprintln!("VM shut down");
        self.bus.send_update(VmUpdate::shutdown());
        self.bus.close_updates();
    }

    fn handle_command(&mut self, command: &VmCommand, running: &mut bool, shutdown: &mut bool) {
        match command.cmd.as_str() {
            "boot" => {
                // The first boot is a power-on; a boot after a breakpoint
                // stop just resumes.
                if !self.booted {
                    self.reset(true);
                    self.booted = true;
                }
                *running = true;
            }
            "reset" => self.reset(false),
            "shutdown" => *shutdown = true,
            "press" | "release" => {
                if !self.bus.keyboard.key_event(&command.data, command.cmd == "press") {
                    eprintln!("unknown key {:?}", command.data);
                }
            }
            "add_breakpoint" => {
                self.add_breakpoint(command.addr as u16);
                eprintln!("breakpoint added at {:04X}", command.addr);
            }
            "tron" => {
                self.trace = !self.trace;
                let message = if self.trace { "Trace is on" } else { "Trace is off" };
                self.bus.send_update(VmUpdate::message(message));
            }
            "set_disk0" | "set_disk1" => {
                let drive = usize::from(command.cmd == "set_disk1");
                self.mount_disk(drive, &command.data, shutdown);
            }
            "set_cassette" => {
                self.set_cassette_file(PathBuf::from(&command.data));
                self.bus
                    .send_update(VmUpdate::message(&format!("cassette: {}", command.data)));
            }
            other => eprintln!("unknown VM command {other:?}"),
        }
    }

    fn mount_disk(&mut self, drive: usize, path: &str, shutdown: &mut bool) {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                let message = format!("can't read disk {path}: {e}");
                eprintln!("{message}");
                self.bus.send_update(VmUpdate::message(&message));
                return;
            }
        };

        match self.load_disk(drive, data) {
            Ok(()) => eprintln!("loaded disk {path} into drive {drive}"),
            Err(message) => {
                // An unrecognized image means we'd be lying to the program;
                // refuse loudly.
                eprintln!("fatal: {message}");
                self.bus.send_update(VmUpdate::message(&message));
                *shutdown = true;
            }
        }
    }
}

/// Well-known Model III ROM entry points, annotated in the trace.
fn rom_routine(pc: u16) -> Option<&'static str> {
    let name = match pc {
        0x0000 => "$RESET: Reset computer",
        0x002B => "$KBCHAR: Get character from keyboard into A, or 0 if none pressed",
        0x0033 => "$VDCHAR: Display character A at current position",
        0x003B => "$PRCHAR: Send A to printer",
        0x0040 => "$KBLINE: Input into (HL) for max B chars",
        0x0049 => "$KBWAIT: Wait for a keyboard character, put into A",
        0x0060 => "$DELAY: Delay about BC*14.8 us",
        0x0069 => "$INITIO: Initialize all I/O drivers",
        0x01C9 => "$VDCLS: Clear the screen",
        0x01F8 => "$CSOFF: Turn off cassette",
        0x021B => "$VDLINE: Display (HL), terminated by 03 or 0D",
        0x0235 => "$CSIN: Input a byte from cassette",
        0x0264 => "$CSOUT: Write byte to cassette",
        0x0287 => "$CSHWR: Write leader and sync byte",
        0x0296 => "$CSHIN: Search for cassette header and sync byte",
        0x028D => "$KBBRK: Check for Break key only",
        0x0298 => "$CLKON: Enable clock display",
        0x02A1 => "$CLKOFF: Disable clock display",
        0x1A19 => "$READY: Print Ready prompt",
        0x3033 => "$DATE: Get today's date to (HL)",
        0x3036 => "$TIME: Get the time to (HL)",
        _ => return None,
    };
    Some(name)
}
