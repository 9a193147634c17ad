//! strafe - Loader
//!
//! Compiles to the injectable library (`strafe.dll` / `libstrafe.so`). All
//! behavior lives in `strafe-core`; this crate only provides the entry points
//! the host's loader or an injector calls.

pub mod ffi;
