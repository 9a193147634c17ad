//! Movement integrator
//!
//! Replaces the host's velocity update with a ground/air acceleration model.
//! The state (ground, air, ladder) is read from the host's own flags every
//! frame; nothing here keeps state between frames.

mod integrator;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strafe_sdk::Vec3;

pub use integrator::{accelerate, air, apply_friction, ground, wish_direction};

/// Movement constants
///
/// Rates are per millisecond of frame time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    pub ground_acceleration: f32,
    pub air_acceleration: f32,
    pub ground_friction: f32,
    pub max_ground_speed: f32,
    pub max_air_speed: f32,
    /// Vertical velocity given by an auto-hop
    pub jump_velocity: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            ground_acceleration: 0.01,
            air_acceleration: 0.0075,
            ground_friction: 0.0,
            max_ground_speed: 1.0,
            max_air_speed: 10.0,
            jump_velocity: 2.0,
        }
    }
}

bitflags! {
    /// Host surface flags for the current frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SurfaceFlags: u8 {
        const ON_FLOOR = 1 << 0;
        const ON_LADDER = 1 << 1;
        const IN_WATER = 1 << 2;
    }
}

/// Which integrator a frame used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    Ground,
    Air,
    /// Host keeps control on ladders
    Ladder,
}

impl MoveState {
    pub fn from_surface(surface: SurfaceFlags) -> Self {
        if surface.contains(SurfaceFlags::ON_LADDER) {
            MoveState::Ladder
        } else if surface.contains(SurfaceFlags::ON_FLOOR) {
            MoveState::Ground
        } else {
            MoveState::Air
        }
    }
}

/// Player physics state the integrator reads and writes
pub trait Body {
    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);
    /// Facing, degrees
    fn yaw(&self) -> f32;
    fn surface(&self) -> SurfaceFlags;
    fn set_on_floor(&mut self, on_floor: bool);
}

/// Run one frame of the movement model against `body`
pub fn integrate(body: &mut dyn Body, wish: Vec3, tunables: &Tunables, dt: f32) -> MoveState {
    let state = MoveState::from_surface(body.surface());
    let previous = body.velocity();

    let next = match state {
        MoveState::Ground => ground(wish, previous, tunables, dt),
        MoveState::Air => air(wish, previous, tunables, dt),
        MoveState::Ladder => return state,
    };

    body.set_velocity(next);
    state
}

/// Jump as soon as the floor is touched while jump is held
///
/// Returns whether a jump was started.
pub fn auto_hop(body: &mut dyn Body, jump_held: bool, tunables: &Tunables) -> bool {
    if !jump_held || !body.surface().contains(SurfaceFlags::ON_FLOOR) {
        return false;
    }

    body.set_on_floor(false);
    let mut velocity = body.velocity();
    velocity.z = tunables.jump_velocity;
    body.set_velocity(velocity);
    true
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory stand-in for the host's player
    #[derive(Debug, Default, Clone)]
    pub(crate) struct TestBody {
        pub velocity: Vec3,
        pub yaw: f32,
        pub surface: SurfaceFlags,
    }

    impl Body for TestBody {
        fn velocity(&self) -> Vec3 {
            self.velocity
        }

        fn set_velocity(&mut self, velocity: Vec3) {
            self.velocity = velocity;
        }

        fn yaw(&self) -> f32 {
            self.yaw
        }

        fn surface(&self) -> SurfaceFlags {
            self.surface
        }

        fn set_on_floor(&mut self, on_floor: bool) {
            self.surface.set(SurfaceFlags::ON_FLOOR, on_floor);
        }
    }

    fn tunables() -> Tunables {
        Tunables {
            ground_acceleration: 10.0,
            air_acceleration: 1.0,
            ground_friction: 0.0,
            max_ground_speed: 2.0,
            max_air_speed: 5.0,
            jump_velocity: 2.0,
        }
    }

    #[test]
    fn test_state_selection() {
        assert_eq!(MoveState::from_surface(SurfaceFlags::empty()), MoveState::Air);
        assert_eq!(MoveState::from_surface(SurfaceFlags::ON_FLOOR), MoveState::Ground);
        assert_eq!(
            MoveState::from_surface(SurfaceFlags::ON_FLOOR | SurfaceFlags::ON_LADDER),
            MoveState::Ladder
        );
        assert_eq!(MoveState::from_surface(SurfaceFlags::IN_WATER), MoveState::Air);
    }

    #[test]
    fn test_integrate_on_ground() {
        let mut body = TestBody {
            surface: SurfaceFlags::ON_FLOOR,
            ..TestBody::default()
        };

        let state = integrate(&mut body, Vec3::new(1.0, 0.0, 0.0), &tunables(), 0.016);

        assert_eq!(state, MoveState::Ground);
        assert!((body.velocity.x - 0.16).abs() < 1e-6);
    }

    #[test]
    fn test_integrate_in_air_uses_air_constants() {
        let mut body = TestBody::default();

        let state = integrate(&mut body, Vec3::new(0.0, 1.0, 0.0), &tunables(), 0.5);

        assert_eq!(state, MoveState::Air);
        assert!((body.velocity.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_integrate_leaves_ladder_alone() {
        let mut body = TestBody {
            velocity: Vec3::new(0.0, 0.0, 1.0),
            surface: SurfaceFlags::ON_LADDER,
            ..TestBody::default()
        };

        let state = integrate(&mut body, Vec3::new(1.0, 0.0, 0.0), &tunables(), 16.0);

        assert_eq!(state, MoveState::Ladder);
        assert_eq!(body.velocity, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_auto_hop() {
        let mut body = TestBody {
            velocity: Vec3::new(0.5, 0.0, 0.0),
            surface: SurfaceFlags::ON_FLOOR,
            ..TestBody::default()
        };

        assert!(!auto_hop(&mut body, false, &tunables()));
        assert!(auto_hop(&mut body, true, &tunables()));
        assert_eq!(body.velocity, Vec3::new(0.5, 0.0, 2.0));
        assert!(!body.surface.contains(SurfaceFlags::ON_FLOOR));

        // Already airborne
        assert!(!auto_hop(&mut body, true, &tunables()));
    }

    #[test]
    fn test_tunables_defaults() {
        let t = Tunables::default();
        assert_eq!(t.air_acceleration, 0.0075);
        assert_eq!(t.ground_acceleration, 0.01);
        assert_eq!(t.max_air_speed, 10.0);
    }
}
