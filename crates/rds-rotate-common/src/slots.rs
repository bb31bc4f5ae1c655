//! Current/previous slot transitions
//!
//! A forward rotation and a rollback both end the same way: the replica that
//! was just provisioned (a fresh clone, or the previous replica brought back)
//! becomes `current`, and whatever was live before is demoted to `previous`.
//! Re-running against the replica that is already current leaves `previous`
//! untouched so the pointer never names one resource twice.

use crate::document::{Slot, Slots};

/// Slots after `provisioned` has been made live.
pub fn next_slots(old: &Slots, provisioned: Slot) -> Slots {
    let previous = if old.current.instance_identifier == provisioned.instance_identifier {
        old.previous.clone()
    } else {
        old.current.clone()
    };
    Slots {
        current: provisioned,
        previous,
    }
}
