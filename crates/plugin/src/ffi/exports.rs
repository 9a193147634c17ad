//! Process entry points
//!
//! The library attaches itself when it is mapped into the host: `DllMain` on
//! Windows, an `.init_array` constructor on Linux. Neither may do real work
//! while the loader lock is held, so both only start the attach thread.
//! `strafe_attach` is exported for injectors that call an entry point
//! explicitly instead.

use std::ffi::{c_char, c_void};
use std::sync::Once;

use tracing::instrument;
use tracing_subscriber::EnvFilter;

use strafe_core::config::gamedata_path;
use strafe_core::{Gamedata, StrafeConfig};

// Static strings with null terminators for C callers
static NAME: &[u8] = b"strafe\0";
static VERSION: &[u8] = b"0.1.0\0";

static ATTACH: Once = Once::new();

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins; otherwise `debug` or `info` depending on the config.
fn init_logging(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Load settings and attach
///
/// Returns a message for the log on failure.
pub fn bootstrap() -> Result<(), String> {
    let config = match StrafeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging(false);
            tracing::warn!("Using default config: {}", e);
            StrafeConfig::default()
        }
    };
    init_logging(config.debug);

    tracing::info!("strafe loading...");
    tracing::info!("Attach thread ID: {:?}", std::thread::current().id());

    let path = gamedata_path().map_err(|e| format!("Gamedata path: {}", e))?;
    let gamedata = Gamedata::load_or_builtin(&path).map_err(|e| format!("Gamedata: {}", e))?;

    strafe_core::attach(&config, gamedata).map_err(|e| format!("Attach failed: {}", e))?;

    tracing::info!("strafe loaded successfully!");
    Ok(())
}

fn run_bootstrap() {
    if let Err(e) = bootstrap() {
        tracing::error!("{}", e);
    }
}

/// Start the attach thread, once per process
fn spawn_attach_thread() {
    ATTACH.call_once(|| {
        let spawned = std::thread::Builder::new()
            .name("strafe-attach".into())
            .spawn(run_bootstrap);

        if let Err(e) = spawned {
            eprintln!("strafe: failed to start attach thread: {}", e);
        }
    });
}

/// Attach on the calling thread
///
/// Returns `false` if attaching failed or had already happened.
#[no_mangle]
#[instrument(skip_all)]
pub extern "C" fn strafe_attach() -> bool {
    let mut attached = false;
    ATTACH.call_once(|| {
        attached = match std::panic::catch_unwind(bootstrap) {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!("{}", e);
                false
            }
            Err(_) => {
                tracing::error!("Panic during attach");
                false
            }
        };
    });
    attached
}

#[no_mangle]
pub extern "C" fn strafe_get_name() -> *const c_char {
    NAME.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn strafe_get_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn strafe_is_attached() -> bool {
    strafe_core::is_attached()
}

#[cfg(windows)]
const DLL_PROCESS_ATTACH: u32 = 1;

/// Windows loader entry point
#[cfg(windows)]
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn DllMain(_module: *mut c_void, reason: u32, _reserved: *mut c_void) -> i32 {
    if reason == DLL_PROCESS_ATTACH {
        spawn_attach_thread();
    }
    1
}

#[cfg(all(target_os = "linux", not(test)))]
#[used]
#[link_section = ".init_array"]
static ON_LOAD: extern "C" fn() = on_load;

#[cfg(target_os = "linux")]
extern "C" fn on_load() {
    spawn_attach_thread();
}
