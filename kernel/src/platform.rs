/// Platform control — the narrow capability the shell uses instead of raw
/// hardware operations. One implementation per target; the shell core only
/// ever calls through this trait.
pub trait PlatformControl {
    /// Operator-visible pause for perceived progress. Busy-waits; the shell
    /// owns the only control thread, so nothing else wants the CPU.
    fn delay(&mut self);

    /// Request platform power-off. Returns only if the request did not take
    /// effect.
    fn power_off(&mut self);

    /// Request a platform reset. Returns only if the request did not take
    /// effect.
    fn reboot(&mut self);

    /// Stop the processor. Never returns on real hardware; test doubles
    /// return so sequences can be asserted on.
    fn halt(&mut self);
}

/// x86_64 implementation over the arch primitives.
#[cfg(not(test))]
pub struct X86Platform;

#[cfg(not(test))]
impl PlatformControl for X86Platform {
    fn delay(&mut self) {
        crate::arch::x86_64::timer::delay_us(500_000);
    }

    fn power_off(&mut self) {
        crate::arch::x86_64::power::power_off();
    }

    fn reboot(&mut self) {
        crate::arch::x86_64::power::reset();
    }

    fn halt(&mut self) {
        crate::arch::x86_64::power::halt_forever();
    }
}
