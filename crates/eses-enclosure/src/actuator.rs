//! The seam between the engine and the surrounding drive/power simulation.

/// Drive and power actuation the enclosure delegates to its host.
///
/// The engine tracks element state; whether a drive is physically in a slot,
/// and the fabric-visible login session for it, belong to the surrounding
/// simulation. Control-page side effects (disabling a phy, powering a slot
/// off) call back through this trait.
///
/// Implementations are queried and driven only from within a single
/// command's execution, so they need no internal synchronization beyond what
/// the caller already provides.
pub trait SlotActuator {
    /// Whether a drive is physically present in the slot.
    fn slot_occupied(&self, slot: u8) -> bool;

    /// Whether the drive in the slot currently holds a fabric login.
    fn drive_logged_in(&self, slot: u8) -> bool;

    /// Logs the drive in the slot into the fabric.
    fn login_drive(&mut self, slot: u8);

    /// Logs the drive in the slot out of the fabric.
    fn logout_drive(&mut self, slot: u8);

    /// Power cycles the drive in the slot.
    fn power_cycle_drive(&mut self, slot: u8);

    /// Power cycles the local LCC after `delay` half-second ticks.
    fn power_cycle_lcc(&mut self, delay: u8);
}
