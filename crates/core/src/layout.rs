//! Host structure layouts
//!
//! Field offsets of host-owned structures are configuration, not code: they
//! start from the built-in table in `strafe-sdk` and can be replaced from
//! gamedata at attach time. Types generated by `#[derive(HostStruct)]` look up
//! the installed table on every access.

use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use std::sync::OnceLock;

use strafe_sdk::physent;

/// An offset table with one process-wide active instance
pub trait HostLayout: 'static {
    /// The active table
    fn current() -> &'static Self;
}

/// Typed view of a host-owned object
pub trait HostObject: Sized {
    /// Address of the field block
    fn ptr(&self) -> *mut c_void;

    /// Host-side type name
    fn type_name(&self) -> &'static str;

    fn is_valid(&self) -> bool;

    /// Wrap a raw pointer, `None` if null
    ///
    /// # Safety
    /// `ptr` must point at a live object with the layout of the active table.
    unsafe fn from_ptr(ptr: *mut c_void) -> Option<Self>;
}

/// Offsets inside the host's physics entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysentLayout {
    pub origin: usize,
    pub velocity: usize,
    pub yaw: usize,
    pub pitch: usize,
    pub roll: usize,
    pub max_speed: usize,
    pub time_in_air: usize,
    pub in_water: usize,
    pub on_floor: usize,
    pub on_ladder: usize,
    pub crouching: usize,
}

impl PhysentLayout {
    /// Offsets of the reference build
    pub const BUILTIN: PhysentLayout = PhysentLayout {
        origin: physent::ORIGIN,
        velocity: physent::VELOCITY,
        yaw: physent::YAW,
        pitch: physent::PITCH,
        roll: physent::ROLL,
        max_speed: physent::MAX_SPEED,
        time_in_air: physent::TIME_IN_AIR,
        in_water: physent::IN_WATER,
        on_floor: physent::ON_FLOOR,
        on_ladder: physent::ON_LADDER,
        crouching: physent::CROUCHING,
    };
}

impl Default for PhysentLayout {
    fn default() -> Self {
        Self::BUILTIN
    }
}

static PHYSENT: OnceLock<PhysentLayout> = OnceLock::new();

impl HostLayout for PhysentLayout {
    fn current() -> &'static Self {
        PHYSENT.get().unwrap_or(&PhysentLayout::BUILTIN)
    }
}

/// Make `layout` the active physent table
///
/// Only the first call wins; later calls return `false`.
pub fn install_physent_layout(layout: PhysentLayout) -> bool {
    let installed = PHYSENT.set(layout).is_ok();
    if installed {
        tracing::debug!("Installed physent layout {:?}", layout);
    } else {
        tracing::warn!("Physent layout already installed, keeping the first one");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_offsets() {
        let layout = PhysentLayout::default();
        assert_eq!(layout.velocity, 0x0C);
        assert_eq!(layout.yaw, 0x30);
        assert_eq!(layout.on_floor, 0x59);
        assert_eq!(layout.on_ladder, 0x5A);
    }

    #[test]
    fn test_partial_override() {
        let layout: PhysentLayout = serde_json::from_str(r#"{ "velocity": 16 }"#).unwrap();
        assert_eq!(layout.velocity, 16);
        assert_eq!(layout.yaw, physent::YAW);
    }
}
