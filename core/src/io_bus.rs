use crate::Bus;

/// A bus that also supports separate I/O port operations.
///
/// The Z80 has a separate 8-bit I/O address space accessed via IN and OUT
/// instructions. Port reads take `&mut self`: on real hardware many status
/// reads are acknowledgements (timer, interrupt latches, FDC status).
pub trait IoBus: Bus {
    /// Read a byte from the given I/O port.
    fn read_io(&mut self, port: u8) -> u8;

    /// Write a byte to the given I/O port.
    fn write_io(&mut self, port: u8, value: u8);
}
