//! Local player access

use std::ffi::c_void;
use std::marker::PhantomData;

use strafe_macros::HostStruct;
use strafe_sdk::Vec3;

use crate::layout::{HostObject, PhysentLayout};
use crate::memory::{self, MemoryError};
use crate::movement::{Body, SurfaceFlags};

/// The host's physics entity for the local player
#[derive(HostStruct)]
#[host(layout = "PhysentLayout", name = "physent")]
pub struct PlayerState {
    ptr: *mut c_void,

    #[host(field = "origin", readonly)]
    _origin: PhantomData<Vec3>,

    #[host(field = "velocity")]
    _vel: PhantomData<Vec3>,

    #[host(field = "yaw", readonly)]
    _facing: PhantomData<f32>,

    #[host(field = "pitch", readonly)]
    _pitch: PhantomData<f32>,

    #[host(field = "max_speed", readonly)]
    _max_speed: PhantomData<f32>,

    #[host(field = "in_water", readonly)]
    _water_flag: PhantomData<u8>,

    #[host(field = "on_floor")]
    _floor_flag: PhantomData<u8>,

    #[host(field = "on_ladder", readonly)]
    _ladder_flag: PhantomData<u8>,
}

impl Body for PlayerState {
    fn velocity(&self) -> Vec3 {
        self.vel()
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.set_vel(velocity);
    }

    fn yaw(&self) -> f32 {
        self.facing()
    }

    fn surface(&self) -> SurfaceFlags {
        let mut surface = SurfaceFlags::empty();
        surface.set(SurfaceFlags::ON_FLOOR, self.floor_flag() != 0);
        surface.set(SurfaceFlags::ON_LADDER, self.ladder_flag() != 0);
        surface.set(SurfaceFlags::IN_WATER, self.water_flag() != 0);
        surface
    }

    fn set_on_floor(&mut self, on_floor: bool) {
        self.set_floor_flag(u8::from(on_floor));
    }
}

/// Follow the local-player pointer at `slot`
///
/// The pointer addresses the object's vtable; the field block starts
/// `header` bytes further on. A null pointer means no player is spawned.
///
/// # Safety
/// `slot` must be the (rebased) address of the host's local-player pointer.
pub unsafe fn local_player(slot: usize, header: usize) -> Result<Option<PlayerState>, MemoryError> {
    let object = memory::read::<usize>(slot)?;
    if object == 0 {
        return Ok(None);
    }

    Ok(PlayerState::from_ptr((object + header) as *mut c_void))
}
