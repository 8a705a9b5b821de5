use chrono::{DateTime, Local};

/// The engine's single clock seam.
///
/// All wall-clock reads in the admission path go through this function
/// instead of calling `Local::now()` directly, so deadline arithmetic and
/// housekeeping sweeps can be exercised against fixed instants in tests.
pub fn now() -> DateTime<Local> {
    Local::now()
}
