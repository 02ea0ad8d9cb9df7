/// A bus that supports memory read/write operations.
///
/// This is the base trait for all systems. The bus handles address decoding
/// and routing to the appropriate device: ROM, RAM, and any memory-mapped
/// I/O the machine wires into its address space.
pub trait Bus {
    /// Read a byte from the given address.
    ///
    /// Reads may have side effects (memory-mapped devices), so the bus is
    /// taken mutably.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}
