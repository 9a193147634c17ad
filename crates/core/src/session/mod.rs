//! Attached session
//!
//! Holds the frame driver and address table for the life of the process and
//! installs every hook. Installation order matters: all hooks are created
//! disabled, the session is published, and only then is the input-check hook
//! enabled, so no detour can run against a half-built session. The
//! directional hooks stay disabled until their toggle enables the group.

mod detours;

use parking_lot::Mutex;
use std::sync::LazyLock;
use std::time::Instant;

use strafe_engine::{init_image, HostImage, ImageError};

use crate::config::{IntegrationMode, StrafeConfig};
use crate::frame::{FrameDriver, FrameReport, DIRECTIONAL_GROUP};
use crate::gamedata::Gamedata;
use crate::hooks::{HookError, HookManager, ObserverCall, RegisterContext, SavedRegister};
use crate::input::AsyncKeyState;
use crate::layout::install_physent_layout;
use crate::movement::{Body, MoveState};
use crate::player::{self, PlayerState};
use crate::toggles::HookGroupEffects;

use detours::{directional_hooks, on_check_input, on_friction, CHECK_INPUT_HOOK};

/// Errors that stop an attach
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("Already attached")]
    AlreadyAttached,

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Failed to hook '{name}': {source}")]
    Hook {
        name: String,
        #[source]
        source: HookError,
    },
}

fn hook_error(name: &str) -> impl FnOnce(HookError) -> AttachError + '_ {
    move |source| AttachError::Hook {
        name: name.to_string(),
        source,
    }
}

/// Everything the detours need
pub struct HostSession {
    driver: FrameDriver,
    image: &'static HostImage,
    gamedata: Gamedata,
    keys: AsyncKeyState,
}

/// The single session; `None` until attach completes
static SESSION: LazyLock<Mutex<Option<HostSession>>> = LazyLock::new(|| Mutex::new(None));

/// Run `f` on the session, if attached
fn with_session<R>(f: impl FnOnce(&mut HostSession) -> R) -> Option<R> {
    SESSION.lock().as_mut().map(f)
}

impl HostSession {
    /// The local player, if one is spawned
    fn local_player(&self) -> Option<PlayerState> {
        let slot = self.image.rebase(self.gamedata.local_player);
        match unsafe { player::local_player(slot, self.gamedata.object_header) } {
            Ok(player) => player,
            Err(err) => {
                tracing::error!("Failed to read local player: {}", err);
                None
            }
        }
    }

    /// One host frame
    fn frame(&mut self) -> FrameReport {
        let mut player = self.local_player();
        self.driver.tick_at(
            Instant::now(),
            &self.keys,
            &mut HookGroupEffects,
            player.as_mut().map(|p| p as &mut dyn Body),
        )
    }

    /// Overwrite the host's velocity with this frame's sample
    ///
    /// Only when the friction site is moving the local player; other entities
    /// pass through the same code and must not consume the sample.
    fn apply_pending(
        &mut self,
        ctx: &RegisterContext,
        register: Option<SavedRegister>,
    ) -> Option<MoveState> {
        self.driver.pending()?;
        let mut player = self.local_player()?;
        let block = player.as_ptr() as usize;
        if !moves_entity(ctx, register, block, self.gamedata.object_header) {
            return None;
        }
        self.driver.apply_pending(&mut player)
    }
}

/// Whether the saved registers point at the entity whose field block is at
/// `block`, either at the block itself or at the object `header` bytes before it
fn moves_entity(
    ctx: &RegisterContext,
    register: Option<SavedRegister>,
    block: usize,
    header: usize,
) -> bool {
    ctx.holds(register, block) || ctx.holds(register, block.wrapping_sub(header))
}

/// Whether attach has completed
pub fn is_attached() -> bool {
    SESSION.lock().is_some()
}

/// Install every hook and start driving frames
#[tracing::instrument(skip_all)]
pub fn attach(config: &StrafeConfig, gamedata: Gamedata) -> Result<(), AttachError> {
    if is_attached() {
        return Err(AttachError::AlreadyAttached);
    }

    let image = init_image(HostImage::discover(gamedata.image_base)?)?;
    install_physent_layout(gamedata.physent);

    let functions = gamedata.functions;

    let mut directional = Vec::new();
    for hook in directional_hooks() {
        let target = image.rebase((hook.target)(&functions));
        let key = unsafe { hook.slot.install(target, hook.detour) }
            .map_err(hook_error(hook.slot.name()))?;
        tracing::debug!("{:?} handler hooked at {:#x}", hook.direction, target);
        directional.push(key);
    }
    HookManager::register_group(DIRECTIONAL_GROUP, directional);

    let check_input = image.rebase(functions.check_input);
    let check_input_key = unsafe {
        CHECK_INPUT_HOOK.install(check_input, on_check_input as detours::CheckInputFn)
    }
    .map_err(hook_error(CHECK_INPUT_HOOK.name()))?;

    if config.mode == IntegrationMode::MidHook {
        for site in &gamedata.mid_hooks {
            let register = site.entity_register.map_or(0, SavedRegister::code);
            let injector = ObserverCall::new(on_friction as usize)
                .with_context()
                .and_then(|call| call.with_args(&[register]))
                .map_err(hook_error(&site.name))?
                .into_injector();
            let address = image.rebase(site.address);
            unsafe { HookManager::create_mid(&site.name, address, site.size, Some(injector)) }
                .map_err(hook_error(&site.name))?;
        }
    }

    *SESSION.lock() = Some(HostSession {
        driver: FrameDriver::new(config, Instant::now()),
        image,
        gamedata,
        keys: AsyncKeyState,
    });

    HookManager::enable(check_input_key.into()).map_err(hook_error(CHECK_INPUT_HOOK.name()))?;

    tracing::info!("Attached in {:?} mode", config.mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_session_is_inert() {
        assert!(!is_attached());
        assert_eq!(with_session(|session| session.driver.frame_count()), None);

        // Detours are safe to reach before attach
        let mut ctx = RegisterContext::default();
        detours::on_friction(&mut ctx, 0);
    }

    #[test]
    fn test_friction_observer_matches_only_the_local_entity() {
        let mut ctx = RegisterContext::default();
        let header = std::mem::size_of::<usize>();
        let block = 0x10_0008;

        assert!(!moves_entity(&ctx, None, block, header));

        set_si(&mut ctx, block - header);
        assert!(moves_entity(&ctx, None, block, header));
        assert!(moves_entity(&ctx, Some(SavedRegister::Si), block, header));
        assert!(!moves_entity(&ctx, Some(SavedRegister::Di), block, header));

        // Another entity in the named register
        set_si(&mut ctx, 0x20_0000);
        assert!(!moves_entity(&ctx, Some(SavedRegister::Si), block, header));
    }

    #[cfg(target_arch = "x86_64")]
    fn set_si(ctx: &mut RegisterContext, value: usize) {
        ctx.rsi = value as u64;
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn set_si(ctx: &mut RegisterContext, value: usize) {
        ctx.esi = value as u32;
    }

    #[test]
    fn test_directional_hooks_cover_every_direction() {
        let hooks = directional_hooks();
        let table = Gamedata::builtin().functions;

        assert_eq!(hooks.len(), 5);
        for (hook, direction) in hooks.iter().zip(crate::input::Direction::ALL) {
            assert_eq!(hook.direction, direction);
            assert_eq!(hook.slot.name(), direction.name());
        }
        assert_eq!((hooks[0].target)(&table), strafe_sdk::reference::PLAYER_FORWARD);
        assert_eq!((hooks[4].target)(&table), strafe_sdk::reference::PLAYER_JUMP);
        assert!(hooks.iter().all(|hook| !hook.slot.is_installed()));
    }
}
