//! Frame driver
//!
//! Runs once per host frame from the input-check hook. Owns every piece of
//! mutable state the movement code needs ([`FrameContext`]) and drives, in
//! order: toggle polling, auto-hop, then either integrating velocity right
//! away (overlay mode) or leaving a sample for the mid-hook observer to
//! consume after the host's own friction step (mid-hook mode).

mod timing;

pub use timing::Stopwatch;

use std::time::{Duration, Instant};

use strafe_sdk::Vec3;

use crate::config::{IntegrationMode, StrafeConfig};
use crate::input::{InputDirection, KeySource};
use crate::movement::{self, Body, MoveState, Tunables};
use crate::toggles::{Effect, EffectSink, ToggleRegistry, Transition, TransitionTable};

/// Toggle name for auto-hop
pub const AUTO_HOP: &str = "Auto-hopping";

/// Toggle name for the replacement movement model
pub const SOURCE_MOVEMENT: &str = "Source movements";

/// Hook group holding the directional input hooks
pub const DIRECTIONAL_GROUP: &str = "directional";

/// Frames slower than this get a warning
const SLOW_FRAME: Duration = Duration::from_millis(1);

/// Wish direction and frame time waiting for the mid-hook observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub wish: Vec3,
    pub dt: f32,
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    /// A toggle changed this tick
    pub toggled: bool,
    /// Auto-hop started a jump
    pub hopped: bool,
    /// Integrator that ran, if any
    pub integrated: Option<MoveState>,
    /// A sample was left for the observer
    pub deferred: bool,
}

/// Mutable per-process movement state
#[derive(Debug)]
pub struct FrameContext {
    pub input: InputDirection,
    pub toggles: ToggleRegistry,
    pub tunables: Tunables,
    toggle_clock: Stopwatch,
    frame_clock: Stopwatch,
    pending: Option<FrameSample>,
    frames: u64,
}

/// Transitions for the default toggles
pub fn default_transitions() -> TransitionTable {
    TransitionTable::new()
        .on(
            SOURCE_MOVEMENT,
            Transition::Enable,
            Effect::EnableGroup(DIRECTIONAL_GROUP.into()),
        )
        .on(
            SOURCE_MOVEMENT,
            Transition::Disable,
            Effect::DisableGroup(DIRECTIONAL_GROUP.into()),
        )
}

/// Drives one frame at a time
#[derive(Debug)]
pub struct FrameDriver {
    ctx: FrameContext,
    mode: IntegrationMode,
}

impl FrameDriver {
    /// Driver with the toggles and tunables from `config`, clocks starting at `now`
    pub fn new(config: &StrafeConfig, now: Instant) -> Self {
        let toggles = ToggleRegistry::new(config.movement.debounce_ms)
            .register(AUTO_HOP, config.toggles.autohop_key)
            .register(SOURCE_MOVEMENT, config.toggles.movement_key)
            .with_transitions(default_transitions());

        Self {
            ctx: FrameContext {
                input: InputDirection::default(),
                toggles,
                tunables: config.movement.tunables,
                toggle_clock: Stopwatch::started_at(now),
                frame_clock: Stopwatch::started_at(now),
                pending: None,
                frames: 0,
            },
            mode: config.mode,
        }
    }

    pub fn context(&self) -> &FrameContext {
        &self.ctx
    }

    pub fn input_mut(&mut self) -> &mut InputDirection {
        &mut self.ctx.input
    }

    pub fn mode(&self) -> IntegrationMode {
        self.mode
    }

    pub fn frame_count(&self) -> u64 {
        self.ctx.frames
    }

    /// Sample left for the observer, if any
    pub fn pending(&self) -> Option<FrameSample> {
        self.ctx.pending
    }

    /// Run one frame
    ///
    /// `body` is `None` when no local player exists; toggles still poll but
    /// nothing is integrated.
    pub fn tick_at(
        &mut self,
        now: Instant,
        keys: &dyn KeySource,
        effects: &mut dyn EffectSink,
        body: Option<&mut dyn Body>,
    ) -> FrameReport {
        let started = Instant::now();
        let ctx = &mut self.ctx;
        let mut report = FrameReport::default();

        ctx.frames += 1;

        let since_toggle = ctx.toggle_clock.elapsed_ms(now);
        if ctx.toggles.poll(since_toggle, keys, effects) {
            ctx.toggle_clock.reset(now);
            report.toggled = true;
        }

        let dt = ctx.frame_clock.lap_ms(now);
        ctx.pending = None;

        let Some(body) = body else {
            return report;
        };

        if ctx.toggles.is_enabled(AUTO_HOP) {
            report.hopped = movement::auto_hop(body, ctx.input.jump, &ctx.tunables);
        }

        if !ctx.toggles.is_enabled(SOURCE_MOVEMENT) {
            return report;
        }

        let wish = movement::wish_direction(body.yaw(), &ctx.input);
        match self.mode {
            IntegrationMode::Overlay => {
                report.integrated = Some(movement::integrate(body, wish, &ctx.tunables, dt));
            }
            IntegrationMode::MidHook => {
                ctx.pending = Some(FrameSample { wish, dt });
                report.deferred = true;
            }
        }

        let spent = started.elapsed();
        if spent > SLOW_FRAME {
            tracing::warn!("Frame {} took {:?}", ctx.frames, spent);
        }

        report
    }

    /// Integrate the pending sample against `body`, at most once per frame
    pub fn apply_pending(&mut self, body: &mut dyn Body) -> Option<MoveState> {
        let sample = self.ctx.pending.take()?;
        Some(movement::integrate(
            body,
            sample.wish,
            &self.ctx.tunables,
            sample.dt,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookError;
    use crate::input::tests::HeldKeys;
    use crate::input::Direction;
    use crate::movement::tests::TestBody;
    use crate::movement::SurfaceFlags;

    const F5: u8 = 0x74;
    const F6: u8 = 0x75;

    #[derive(Default)]
    struct RecordingSink(Vec<Effect>);

    impl EffectSink for RecordingSink {
        fn apply(&mut self, effect: &Effect) -> Result<(), HookError> {
            self.0.push(effect.clone());
            Ok(())
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn driver(mode: IntegrationMode, start: Instant) -> FrameDriver {
        let mut config = StrafeConfig::default();
        config.mode = mode;
        config.movement.tunables = Tunables {
            ground_acceleration: 10.0,
            max_ground_speed: 2.0,
            ..Tunables::default()
        };
        FrameDriver::new(&config, start)
    }

    fn facing_x_on_floor() -> TestBody {
        TestBody {
            yaw: 90.0,
            surface: SurfaceFlags::ON_FLOOR,
            ..TestBody::default()
        }
    }

    #[test]
    fn test_rapid_double_press_flips_once() {
        let start = Instant::now();
        let mut driver = driver(IntegrationMode::Overlay, start);
        let mut sink = RecordingSink::default();
        let pressed = HeldKeys::holding(F6);

        let first = driver.tick_at(start + ms(300), &pressed, &mut sink, None);
        let second = driver.tick_at(start + ms(400), &pressed, &mut sink, None);

        assert!(first.toggled);
        assert!(!second.toggled);
        assert!(driver.context().toggles.is_enabled(SOURCE_MOVEMENT));
        assert_eq!(sink.0, vec![Effect::EnableGroup(DIRECTIONAL_GROUP.into())]);
    }

    #[test]
    fn test_toggle_debounce_measured_from_last_change() {
        let start = Instant::now();
        let mut driver = driver(IntegrationMode::Overlay, start);
        let mut sink = RecordingSink::default();
        let pressed = HeldKeys::holding(F5);
        let idle = HeldKeys::none();

        driver.tick_at(start + ms(100), &idle, &mut sink, None);
        driver.tick_at(start + ms(200), &idle, &mut sink, None);
        assert!(!driver
            .tick_at(start + ms(240), &pressed, &mut sink, None)
            .toggled);
        assert!(driver
            .tick_at(start + ms(260), &pressed, &mut sink, None)
            .toggled);
        assert!(driver
            .tick_at(start + ms(520), &pressed, &mut sink, None)
            .toggled);
        assert!(!driver.context().toggles.is_enabled(AUTO_HOP));
    }

    #[test]
    fn test_disabled_movement_leaves_velocity() {
        let start = Instant::now();
        let mut driver = driver(IntegrationMode::Overlay, start);
        let mut sink = RecordingSink::default();
        let mut body = facing_x_on_floor();
        driver.input_mut().apply(Direction::Forward, true);

        let report = driver.tick_at(start + ms(16), &HeldKeys::none(), &mut sink, Some(&mut body));

        assert_eq!(report.integrated, None);
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_overlay_integrates_with_frame_time() {
        let start = Instant::now();
        let mut driver = driver(IntegrationMode::Overlay, start);
        let mut sink = RecordingSink::default();
        let mut body = facing_x_on_floor();

        driver.tick_at(start + ms(300), &HeldKeys::holding(F6), &mut sink, None);
        driver.input_mut().apply(Direction::Forward, true);

        // 10 per ms over 16 ms is well past the cap of 2
        let report = driver.tick_at(start + ms(316), &HeldKeys::none(), &mut sink, Some(&mut body));

        assert_eq!(report.integrated, Some(MoveState::Ground));
        assert!((body.velocity.x - 2.0).abs() < 1e-4);
        assert!(body.velocity.y.abs() < 1e-4);
    }

    #[test]
    fn test_no_player_skips_frame() {
        let start = Instant::now();
        let mut driver = driver(IntegrationMode::Overlay, start);
        let mut sink = RecordingSink::default();

        let report = driver.tick_at(start + ms(16), &HeldKeys::none(), &mut sink, None);

        assert_eq!(report, FrameReport::default());
        assert_eq!(driver.frame_count(), 1);
    }

    #[test]
    fn test_auto_hop_when_enabled() {
        let start = Instant::now();
        let mut driver = driver(IntegrationMode::Overlay, start);
        let mut sink = RecordingSink::default();
        let mut body = facing_x_on_floor();

        driver.tick_at(start + ms(300), &HeldKeys::holding(F5), &mut sink, None);
        driver.input_mut().apply(Direction::Jump, true);

        let report = driver.tick_at(start + ms(316), &HeldKeys::none(), &mut sink, Some(&mut body));

        assert!(report.hopped);
        assert_eq!(body.velocity.z, 2.0);
        assert!(!body.surface.contains(SurfaceFlags::ON_FLOOR));
    }

    #[test]
    fn test_mid_hook_mode_defers_to_observer() {
        let start = Instant::now();
        let mut driver = driver(IntegrationMode::MidHook, start);
        let mut sink = RecordingSink::default();
        let mut body = facing_x_on_floor();

        driver.tick_at(start + ms(300), &HeldKeys::holding(F6), &mut sink, None);
        driver.input_mut().apply(Direction::Forward, true);

        let report = driver.tick_at(start + ms(301), &HeldKeys::none(), &mut sink, Some(&mut body));
        assert!(report.deferred);
        assert_eq!(body.velocity, Vec3::ZERO);

        let sample = driver.pending().unwrap();
        assert!((sample.dt - 1.0).abs() < 1e-3);

        assert_eq!(driver.apply_pending(&mut body), Some(MoveState::Ground));
        assert!(body.velocity.x > 0.0);

        // Consumed once
        let after = body.velocity;
        assert_eq!(driver.apply_pending(&mut body), None);
        assert_eq!(body.velocity, after);
    }
}
