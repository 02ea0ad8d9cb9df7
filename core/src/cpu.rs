use crate::Bus;

/// A CPU that can execute instructions.
///
/// The type parameter `B` is the bus type this CPU operates on.
pub trait Cpu<B: Bus> {
    /// Execute one instruction. Returns cycles consumed, including any
    /// taken-branch penalty.
    fn step(&mut self, bus: &mut B) -> u32;

    /// Reset the CPU to its initial state.
    fn reset(&mut self);

    /// Take a maskable interrupt: push PC and vector.
    fn interrupt(&mut self, bus: &mut B);

    /// Take a non-maskable interrupt: push PC and vector.
    fn nmi(&mut self, bus: &mut B);

    /// Get the current program counter.
    fn pc(&self) -> u16;
}
