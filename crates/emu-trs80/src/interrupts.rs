//! IRQ and NMI latch/mask bookkeeping.
//!
//! Two independent pairs. An IRQ is pending while `mask & latch` is
//! non-zero; taking it does not clear the latch, devices clear their own
//! bits (the timer by a read of ports EC-EF, the cassette by a read of the
//! cassette byte). An NMI is additionally gated by `nmi_seen`, which
//! latches after the NMI is taken and clears only once `mask & latch`
//! drops to zero, so one edge is serviced exactly once.

// IRQ latch/mask bits.
pub const CASSETTE_RISE_IRQ: u8 = 1 << 0;
pub const CASSETTE_FALL_IRQ: u8 = 1 << 1;
pub const TIMER_IRQ: u8 = 1 << 2;
pub const IO_BUS_IRQ: u8 = 1 << 3;
pub const UART_SEND_IRQ: u8 = 1 << 4;
pub const UART_RECEIVE_IRQ: u8 = 1 << 5;
pub const UART_ERROR_IRQ: u8 = 1 << 6;

pub const CASSETTE_IRQS: u8 = CASSETTE_RISE_IRQ | CASSETTE_FALL_IRQ;

// NMI latch/mask bits.
pub const RESET_NMI: u8 = 0x20;
pub const DISK_MOTOR_OFF_NMI: u8 = 0x40;
pub const DISK_INTRQ_NMI: u8 = 0x80;

/// The machine's interrupt latches and masks.
#[derive(Debug, Default)]
pub struct Interrupts {
    /// Which IRQs the program wants handled.
    pub irq_mask: u8,
    /// Which IRQs the hardware has requested.
    pub irq_latch: u8,
    /// Which NMIs the program wants handled.
    pub nmi_mask: u8,
    /// Which NMIs the hardware has requested.
    pub nmi_latch: u8,
    /// Whether the current NMI edge has already been serviced.
    pub nmi_seen: bool,
}

impl Interrupts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_irq_mask(&mut self, mask: u8) {
        self.irq_mask = mask;
    }

    /// The reset button is always allowed, regardless of what the program
    /// writes.
    pub fn set_nmi_mask(&mut self, mask: u8) {
        self.nmi_mask = mask | RESET_NMI;
        self.update_nmi_seen();
    }

    fn update_nmi_seen(&mut self) {
        if self.nmi_latch & self.nmi_mask == 0 {
            self.nmi_seen = false;
        }
    }

    /// A maskable interrupt is waiting (the CPU still gates on IFF1).
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq_latch & self.irq_mask != 0
    }

    /// A non-maskable interrupt is waiting and not yet serviced.
    #[must_use]
    pub fn nmi_pending(&self) -> bool {
        self.nmi_latch & self.nmi_mask != 0 && !self.nmi_seen
    }

    /// Latch the current NMI edge as serviced.
    pub fn set_nmi_seen(&mut self) {
        self.nmi_seen = true;
    }

    pub fn reset_button_interrupt(&mut self, state: bool) {
        if state {
            self.nmi_latch |= RESET_NMI;
        } else {
            self.nmi_latch &= !RESET_NMI;
        }
        self.update_nmi_seen();
    }

    pub fn disk_motor_off_interrupt(&mut self, state: bool) {
        if state {
            self.nmi_latch |= DISK_MOTOR_OFF_NMI;
        } else {
            self.nmi_latch &= !DISK_MOTOR_OFF_NMI;
        }
        self.update_nmi_seen();
    }

    pub fn disk_intrq_interrupt(&mut self, state: bool) {
        if state {
            self.nmi_latch |= DISK_INTRQ_NMI;
        } else {
            self.nmi_latch &= !DISK_INTRQ_NMI;
        }
        self.update_nmi_seen();
    }

    pub fn timer_interrupt(&mut self, state: bool) {
        if state {
            self.irq_latch |= TIMER_IRQ;
        } else {
            self.irq_latch &= !TIMER_IRQ;
        }
    }

    /// Latch a cassette rising edge, gated by the mask.
    pub fn cassette_rise_interrupt(&mut self) {
        self.irq_latch = (self.irq_latch & !CASSETTE_RISE_IRQ) | (self.irq_mask & CASSETTE_RISE_IRQ);
    }

    /// Latch a cassette falling edge, gated by the mask.
    pub fn cassette_fall_interrupt(&mut self) {
        self.irq_latch = (self.irq_latch & !CASSETTE_FALL_IRQ) | (self.irq_mask & CASSETTE_FALL_IRQ);
    }

    /// Reading the cassette byte acknowledges both cassette interrupts.
    pub fn cassette_clear_interrupt(&mut self) {
        self.irq_latch &= !CASSETTE_IRQS;
    }

    #[must_use]
    pub fn cassette_interrupts_enabled(&self) -> bool {
        self.irq_mask & CASSETTE_IRQS != 0
    }
}
