//! Host detours
//!
//! Host functions are `cdecl`: `int handler(bool began)` for the directional
//! input handlers and `void checkinput()` for the per-frame input poll.

use paste::paste;

use super::{with_session, SESSION};
use crate::gamedata::FunctionTable;
use crate::hooks::{HookSlot, RegisterContext, SavedRegister};
use crate::input::Direction;

pub(crate) type DirectionalFn = extern "C" fn(bool) -> i32;
pub(crate) type CheckInputFn = extern "C" fn();

/// Detour and hook slot for one directional handler
pub(crate) struct DirectionalHook {
    pub direction: Direction,
    pub slot: &'static HookSlot<DirectionalFn>,
    pub detour: DirectionalFn,
    pub target: fn(&FunctionTable) -> usize,
}

macro_rules! directional_detours {
    ($($name:ident => $direction:expr),* $(,)?) => {
        paste! {
            $(
                static [<$name:upper _HOOK>]: HookSlot<DirectionalFn> = HookSlot::new(stringify!($name));

                extern "C" fn [<on_ $name>](began: bool) -> i32 {
                    let forwarded = with_session(|session| session.driver.input_mut().apply($direction, began))
                        .unwrap_or(began);

                    match [<$name:upper _HOOK>].original() {
                        Some(original) => original(forwarded),
                        None => 0,
                    }
                }
            )*

            pub(crate) fn directional_hooks() -> Vec<DirectionalHook> {
                vec![
                    $(
                        DirectionalHook {
                            direction: $direction,
                            slot: &[<$name:upper _HOOK>],
                            detour: [<on_ $name>],
                            target: |functions| functions.$name,
                        },
                    )*
                ]
            }
        }
    };
}

directional_detours! {
    forward => Direction::Forward,
    backward => Direction::Backward,
    left => Direction::Left,
    right => Direction::Right,
    jump => Direction::Jump,
}

pub(crate) static CHECK_INPUT_HOOK: HookSlot<CheckInputFn> = HookSlot::new("checkinput");

/// Let the host dispatch its input events, then run our frame
pub(crate) extern "C" fn on_check_input() {
    if let Some(original) = CHECK_INPUT_HOOK.original() {
        original();
    }

    with_session(|session| session.frame());
}

/// Called from the friction mid-hooks, after the host's own friction step
///
/// `register` is a [`SavedRegister::code`], or 0 to match any register.
/// Runs inside the host's movement code, so it never waits for the session.
pub(crate) extern "C" fn on_friction(ctx: *mut RegisterContext, register: usize) {
    // SAFETY: the observer stub passes its saved register block
    let Some(ctx) = (unsafe { ctx.as_ref() }) else {
        return;
    };

    if let Some(mut guard) = SESSION.try_lock() {
        if let Some(session) = guard.as_mut() {
            session.apply_pending(ctx, SavedRegister::from_code(register));
        }
    }
}
