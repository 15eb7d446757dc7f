/// Coarse lock shown while a configuration request is outstanding.
///
/// Not reference counted: any `set(false)` clears it, even if another
/// operation that set it is still running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BusyIndicator {
    active: bool,
}

impl BusyIndicator {
    pub fn set(&mut self, active: bool) {
        if self.active != active {
            tracing::trace!(active, "busy indicator");
        }
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
