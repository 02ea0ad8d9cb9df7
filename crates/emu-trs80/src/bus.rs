//! The Model III address-space and port-space routers.
//!
//! `TrsBus` owns everything the CPU talks to: ROM, RAM, the screen, the
//! keyboard matrix, the floppy controller, the cassette, the interrupt
//! latches, the event queue, and the virtual clock. The CPU reaches it
//! through the `emu_core` bus traits.
//!
//! # Memory map
//!
//! ROM from 0, then (reads in this order) RAM at 0x4000, screen at 0x3C00,
//! keyboard at 0x3800, printer status at 0x37E8; everything else reads
//! 0xFF. Screen and RAM writes set the initialized bit; screen writes are
//! mirrored to the UI as pokes; ROM writes are dropped.

use std::sync::mpsc::Sender;

use emu_core::{Bus, IoBus};

use crate::cassette::Cassette;
use crate::events::{EventAction, Events};
use crate::fdc::Fdc;
use crate::interrupts::Interrupts;
use crate::keyboard::{Keyboard, KEYBOARD_BEGIN, KEYBOARD_END};
use crate::update::VmUpdate;

/// Screen geometry: 16 rows of 64 characters at 0x3C00.
pub const SCREEN_ROWS: u16 = 16;
pub const SCREEN_COLUMNS: u16 = 64;
pub const SCREEN_BEGIN: u16 = 0x3C00;
pub const SCREEN_END: u16 = SCREEN_BEGIN + SCREEN_ROWS * SCREEN_COLUMNS;

/// True RAM begins here.
pub const RAM_BEGIN: u16 = 0x4000;

/// Memory-mapped printer status. 0x30 = selected, ready, paper, not busy.
pub const PRINTER_STATUS_ADDR: u16 = 0x37E8;
pub const PRINTER_READY: u8 = 0x30;

/// Diagnose reads of RAM nothing ever wrote. Noisy; off unless chasing a
/// memory bug.
const WARN_UNINIT_MEM_READ: bool = false;

/// Diagnose writes to ROM. Harmless on real hardware, may indicate a bug
/// here.
const LOG_ROM_WRITE: bool = false;

/// The machine's bus: memory, devices, clock, and the outbound update
/// channel.
pub struct TrsBus {
    /// All 64 KiB of address space; ROM occupies the bottom.
    pub memory: Vec<u8>,
    /// Whether each byte has ever been written.
    pub mem_init: Vec<bool>,
    /// Size of ROM; addresses below this are read-only.
    pub rom_size: u16,

    /// Cycles since boot.
    pub clock: u64,

    pub keyboard: Keyboard,
    pub fdc: Fdc,
    pub cassette: Cassette,
    pub interrupts: Interrupts,
    pub events: Events,

    /// The byte most recently written to ports EC-EF, latched for
    /// readback at FF.
    pub mode_image: u8,

    update_tx: Option<Sender<VmUpdate>>,

    /// First fatal error raised by a device, if any. Checked by the
    /// machine after each step.
    fatal: Option<String>,
}

impl TrsBus {
    #[must_use]
    pub fn new(rom: &[u8], update_tx: Option<Sender<VmUpdate>>) -> Self {
        let memory_size = 64 * 1024;
        assert!(rom.len() < memory_size, "ROM larger than the address space");

        let mut memory = vec![0u8; memory_size];
        memory[..rom.len()].copy_from_slice(rom);

        Self {
            memory,
            mem_init: vec![false; memory_size],
            rom_size: rom.len() as u16,
            clock: 0,
            keyboard: Keyboard::new(),
            fdc: Fdc::new(),
            cassette: Cassette::new(),
            interrupts: Interrupts::new(),
            events: Events::new(),
            mode_image: 0x80,
            update_tx,
            fatal: None,
        }
    }

    /// Send an update to the UI, if anyone is listening.
    pub fn send_update(&self, update: VmUpdate) {
        if let Some(tx) = &self.update_tx {
            let _ = tx.send(update);
        }
    }

    /// Stop sending updates (used at shutdown, closing the channel).
    pub fn close_updates(&mut self) {
        self.update_tx = None;
    }

    /// Record a fatal error. The first one wins; the machine shuts the VM
    /// down when it sees it.
    pub fn set_fatal(&mut self, message: String) {
        if self.fatal.is_none() {
            self.fatal = Some(message);
        }
    }

    pub fn take_fatal(&mut self) -> Option<String> {
        self.fatal.take()
    }

    /// Run every event due at the current clock. Actions may re-enqueue.
    pub fn dispatch_events(&mut self) {
        while let Some(event) = self.events.pop_due(self.clock) {
            self.run_event(event.action);
        }
    }

    fn run_event(&mut self, action: EventAction) {
        match action {
            EventAction::DiskDone { bits } => self.disk_done(bits),
            EventAction::DiskLostData { command } => self.disk_lost_data(command),
            EventAction::DiskFirstDrq { bits } => self.disk_first_drq(bits),
            EventAction::KickOffCassette => self.kick_off_cassette(),
        }
    }

    /// The 30 Hz heartbeat: raise the timer IRQ and re-check the disk
    /// motor timeout.
    pub fn handle_timer(&mut self) {
        self.interrupts.timer_interrupt(true);
        let motor_off = self.check_disk_motor_off();
        self.interrupts.disk_motor_off_interrupt(motor_off);
    }
}

impl Bus for TrsBus {
    fn read(&mut self, addr: u16) -> u8 {
        if addr < self.rom_size {
            self.memory[addr as usize]
        } else if addr >= RAM_BEGIN {
            if WARN_UNINIT_MEM_READ && !self.mem_init[addr as usize] {
                eprintln!("warning: uninitialized read of RAM at {addr:04X}");
            }
            self.memory[addr as usize]
        } else if (SCREEN_BEGIN..SCREEN_END).contains(&addr) {
            self.memory[addr as usize]
        } else if (KEYBOARD_BEGIN..KEYBOARD_END).contains(&addr) {
            let clock = self.clock;
            self.keyboard.read(addr, clock)
        } else if addr == PRINTER_STATUS_ADDR {
            PRINTER_READY
        } else {
            // Unmapped.
            0xFF
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if addr < self.rom_size {
            if LOG_ROM_WRITE {
                eprintln!("warning: tried to write {value:02X} to ROM at {addr:04X}");
            }
        } else if addr >= RAM_BEGIN {
            self.memory[addr as usize] = value;
            self.mem_init[addr as usize] = true;
        } else if (SCREEN_BEGIN..SCREEN_END).contains(&addr) {
            self.memory[addr as usize] = value;
            self.mem_init[addr as usize] = true;
            self.send_update(VmUpdate::poke(addr, value));
        } else if addr == PRINTER_STATUS_ADDR {
            // Printer data; could be shown, but is dropped.
        } else {
            // Ignore writes anywhere else.
        }
    }
}

impl IoBus for TrsBus {
    fn read_io(&mut self, port: u8) -> u8 {
        match port {
            // Unmapped ports some programs probe; don't crash.
            0x1F | 0x3F => 0xFF,

            // IRQ latch, inverted.
            0xE0 => !self.interrupts.irq_latch,

            // NMI latch, inverted.
            0xE4..=0xE7 => !self.interrupts.nmi_latch,

            // UART modem/switches/status/data: idle line.
            0xE8..=0xEB => 0xFF,

            // Reading acknowledges the timer.
            0xEC..=0xEF => {
                self.interrupts.timer_interrupt(false);
                0xFF
            }

            0xF0 => self.read_disk_status(),
            0xF1 => self.read_disk_track(),
            0xF2 => self.read_disk_sector(),
            0xF3 => self.read_disk_data(),

            // Printer status.
            0xF8..=0xFB => PRINTER_READY,

            // Mode image plus the two cassette bits.
            0xFC..=0xFF => (self.mode_image & 0x7E) | self.cassette_byte(),

            _ => {
                self.set_fatal(format!("can't read from unknown port {port:02X}"));
                0xFF
            }
        }
    }

    fn write_io(&mut self, port: u8, value: u8) {
        match port {
            // Unknown ports some programs poke; ignore.
            0x1F | 0x3F => {}

            // Model 4 video page.
            0x84..=0x87 => {}

            0xE0 => self.interrupts.set_irq_mask(value),
            0xE4..=0xE7 => self.interrupts.set_nmi_mask(value),

            // UART reset/baud/control/data.
            0xE8..=0xEB => {}

            // Mode image: cassette motor, expanded screen, alternate
            // character set, timer speed. Only the motor is wired; the
            // expanded bit is reported to the UI.
            0xEC..=0xEF => {
                let old = self.mode_image;
                self.mode_image = value;
                self.set_cassette_motor(value & 0x02 != 0);
                if (old ^ value) & 0x04 != 0 {
                    self.send_update(VmUpdate::expanded(value & 0x04 != 0));
                }
            }

            0xF0 => self.write_disk_command(value),
            0xF1 => self.write_disk_track(value),
            0xF2 => self.write_disk_sector(value),
            0xF3 => self.write_disk_data(value),
            0xF4..=0xF7 => self.write_disk_select(value),

            // Printer data.
            0xF8..=0xFB => {}

            0xFC..=0xFF => {
                if value & 0x20 != 0 {
                    // Micro Labs graphics card.
                    eprintln!("sending {value:02X} to graphics card");
                } else {
                    self.write_cassette_byte(value & 3);
                }
            }

            _ => {
                self.set_fatal(format!("can't write {value:02X} to unknown port {port:02X}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn make_bus() -> TrsBus {
        // A 0x3800-byte ROM, like the stock Model III ROM.
        let rom = vec![0x55u8; 0x3800];
        TrsBus::new(&rom, None)
    }

    fn make_bus_with_updates() -> (TrsBus, mpsc::Receiver<VmUpdate>) {
        let (tx, rx) = mpsc::channel();
        let rom = vec![0x55u8; 0x3800];
        (TrsBus::new(&rom, Some(tx)), rx)
    }

    #[test]
    fn rom_reads_back_and_refuses_writes() {
        let mut bus = make_bus();
        assert_eq!(bus.read(0x0000), 0x55);
        assert_eq!(bus.read(0x37FF), 0x55, "last ROM byte");
        bus.write(0x0000, 0xAA);
        assert_eq!(bus.read(0x0000), 0x55);
    }

    #[test]
    fn ram_round_trips() {
        let mut bus = make_bus();
        bus.write(0x4000, 0xAB);
        assert_eq!(bus.read(0x4000), 0xAB);
        bus.write(0xFFFF, 0x12);
        assert_eq!(bus.read(0xFFFF), 0x12);
        assert!(bus.mem_init[0x4000]);
        assert!(!bus.mem_init[0x5000]);
    }

    #[test]
    fn unmapped_reads_ff() {
        let rom = vec![0u8; 0x3000];
        let mut bus = TrsBus::new(&rom, None);
        assert_eq!(bus.read(0x3000), 0xFF, "just past ROM");
        assert_eq!(bus.read(0x3A00), 0xFF, "between keyboard and screen");
        bus.write(0x3000, 0x99);
        assert_eq!(bus.read(0x3000), 0xFF, "write was dropped");
    }

    #[test]
    fn printer_status_reads_ready() {
        // With a small ROM the printer address is exposed.
        let rom = vec![0u8; 0x3000];
        let mut bus = TrsBus::new(&rom, None);
        assert_eq!(bus.read(PRINTER_STATUS_ADDR), PRINTER_READY);
    }

    #[test]
    fn screen_write_emits_poke() {
        let (mut bus, rx) = make_bus_with_updates();
        bus.write(0x3C00, b'H');
        assert_eq!(bus.read(0x3C00), b'H');
        assert_eq!(rx.try_recv().unwrap(), VmUpdate::poke(0x3C00, b'H'));
        assert!(rx.try_recv().is_err(), "exactly one update");
    }

    #[test]
    fn irq_mask_and_latch_ports() {
        let mut bus = make_bus();
        bus.write_io(0xE0, 0x04);
        assert_eq!(bus.interrupts.irq_mask, 0x04);

        // The read reflects the latch (inverted), not the mask.
        bus.interrupts.timer_interrupt(true);
        assert_eq!(bus.read_io(0xE0), !0x04);
    }

    #[test]
    fn timer_acknowledged_by_ec_read(){
        let mut bus = make_bus();
        bus.interrupts.set_irq_mask(crate::interrupts::TIMER_IRQ);
        bus.interrupts.timer_interrupt(true);
        assert!(bus.interrupts.irq_pending());

        assert_eq!(bus.read_io(0xEC), 0xFF);
        assert!(!bus.interrupts.irq_pending());

        // A second read without another fire is a no-op.
        let _ = bus.read_io(0xEC);
        assert!(!bus.interrupts.irq_pending());
    }

    #[test]
    fn nmi_mask_write_forces_reset_bit() {
        let mut bus = make_bus();
        bus.write_io(0xE4, 0x00);
        assert_eq!(bus.interrupts.nmi_mask, crate::interrupts::RESET_NMI);
    }

    #[test]
    fn uart_ports_are_stubs() {
        let mut bus = make_bus();
        assert_eq!(bus.read_io(0xE8), 0xFF);
        assert_eq!(bus.read_io(0xEB), 0xFF);
        bus.write_io(0xE9, 0x42);
        assert!(bus.take_fatal().is_none());
    }

    #[test]
    fn unknown_port_is_fatal() {
        let mut bus = make_bus();
        let _ = bus.read_io(0x42);
        assert!(bus.take_fatal().is_some());

        let mut bus = make_bus();
        bus.write_io(0x42, 0x00);
        assert!(bus.take_fatal().is_some());
    }

    #[test]
    fn mode_image_reads_back_at_ff() {
        let mut bus = make_bus();
        bus.write_io(0xEC, 0x48);
        assert_eq!(bus.read_io(0xFF) & 0x7E, 0x48 & 0x7E);
    }

    #[test]
    fn expanded_mode_reported_on_change() {
        let (mut bus, rx) = make_bus_with_updates();
        bus.write_io(0xEC, 0x04);
        assert_eq!(rx.try_recv().unwrap(), VmUpdate::expanded(true));
        bus.write_io(0xEC, 0x04);
        assert!(rx.try_recv().is_err(), "no update without a change");
        bus.write_io(0xEC, 0x00);
        assert_eq!(rx.try_recv().unwrap(), VmUpdate::expanded(false));
    }

    #[test]
    fn graphics_card_write_is_ignored() {
        let mut bus = make_bus();
        bus.write_io(0xFF, 0x20);
        assert!(bus.take_fatal().is_none());
    }
}
