//! Unified hook manager API
//!
//! Provides a single entry point for both hook types, plus named groups of
//! inline hooks that are switched together.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::emitter::Injector;
use super::inline::{self, HookError, InlineHookKey};
use super::midhook::{self, MidHookKey};

/// Unified hook key (can be any hook type)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKey {
    Inline(InlineHookKey),
    Mid(MidHookKey),
}

impl From<InlineHookKey> for HookKey {
    fn from(key: InlineHookKey) -> Self {
        HookKey::Inline(key)
    }
}

impl From<MidHookKey> for HookKey {
    fn from(key: MidHookKey) -> Self {
        HookKey::Mid(key)
    }
}

/// Named groups of inline hooks
static GROUPS: LazyLock<RwLock<HashMap<String, Vec<InlineHookKey>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Central hook manager
pub struct HookManager;

impl HookManager {
    /// Create an inline (detour) hook for a function, initially disabled
    ///
    /// # Safety
    /// Target must be a valid function pointer with matching signature
    ///
    /// # Example
    /// ```ignore
    /// let (key, original) = unsafe {
    ///     HookManager::create_inline("checkinput", target, on_check_input as *const ())?
    /// };
    /// HookManager::enable(key.into())?;
    /// ```
    pub unsafe fn create_inline(
        name: &str,
        target: *const (),
        detour: *const (),
    ) -> Result<(InlineHookKey, *const ()), HookError> {
        inline::create_inline_hook(name, target, detour)
    }

    /// Splice code into a function body
    ///
    /// # Safety
    /// See [`midhook::create_mid_hook`].
    ///
    /// # Example
    /// ```ignore
    /// let injector = ObserverCall::new(on_friction as usize).with_context()?.into_injector();
    /// let key = unsafe { HookManager::create_mid("friction", site, 6, Some(injector))? };
    /// ```
    pub unsafe fn create_mid(
        name: &str,
        target: usize,
        preserve_size: usize,
        injector: Option<Injector>,
    ) -> Result<MidHookKey, HookError> {
        midhook::create_mid_hook(name, target, preserve_size, injector)
    }

    /// Enable a hook by key
    pub fn enable(key: HookKey) -> Result<(), HookError> {
        match key {
            HookKey::Inline(k) => inline::enable_inline_hook(k),
            HookKey::Mid(k) => {
                if midhook::is_mid_hook_enabled(k) {
                    Ok(())
                } else {
                    Err(HookError::NotFound)
                }
            }
        }
    }

    /// Disable a hook by key
    pub fn disable(key: HookKey) -> Result<(), HookError> {
        match key {
            HookKey::Inline(k) => inline::disable_inline_hook(k),
            HookKey::Mid(k) => midhook::disable_mid_hook(k),
        }
    }

    /// Remove a hook completely
    pub fn remove(key: HookKey) -> Result<(), HookError> {
        match key {
            HookKey::Inline(k) => {
                inline::remove_inline_hook(k)?;
                for keys in GROUPS.write().values_mut() {
                    keys.retain(|&member| member != k);
                }
                Ok(())
            }
            HookKey::Mid(_) => Err(HookError::Permanent),
        }
    }

    /// Check if a hook is enabled
    pub fn is_enabled(key: HookKey) -> bool {
        match key {
            HookKey::Inline(k) => inline::is_inline_hook_enabled(k),
            HookKey::Mid(k) => midhook::is_mid_hook_enabled(k),
        }
    }

    /// Register (or replace) a named group of inline hooks
    pub fn register_group(name: &str, keys: Vec<InlineHookKey>) {
        tracing::debug!("Registered hook group '{}' ({} hooks)", name, keys.len());
        GROUPS.write().insert(name.to_string(), keys);
    }

    /// Enable every hook in a group, or none of them
    pub fn enable_group(name: &str) -> Result<(), HookError> {
        Self::switch_group(name, true)
    }

    /// Disable every hook in a group, or none of them
    pub fn disable_group(name: &str) -> Result<(), HookError> {
        Self::switch_group(name, false)
    }

    /// `Some(true)` when every hook in the group is enabled
    pub fn is_group_enabled(name: &str) -> Option<bool> {
        let groups = GROUPS.read();
        let keys = groups.get(name)?;
        Some(!keys.is_empty() && keys.iter().all(|&k| inline::is_inline_hook_enabled(k)))
    }

    /// Keys in a group
    pub fn group(name: &str) -> Option<Vec<InlineHookKey>> {
        GROUPS.read().get(name).cloned()
    }

    fn switch_group(name: &str, enabled: bool) -> Result<(), HookError> {
        let groups = GROUPS.read();
        let keys = groups.get(name).ok_or(HookError::NotFound)?;

        inline::set_inline_hooks_enabled(keys, enabled)?;

        tracing::info!(
            "{} hook group '{}' ({} hooks)",
            if enabled { "Enabled" } else { "Disabled" },
            name,
            keys.len()
        );
        Ok(())
    }
}

#[cfg(all(test, target_arch = "x86_64"))]
mod tests {
    use super::*;
    use crate::hooks::inline::tests::host_fn;

    extern "sysv64" fn zero(_: u64) -> u64 {
        0
    }

    #[test]
    fn test_group_enable_disable() {
        let hosts: Vec<_> = (0..3).map(|_| host_fn()).collect();
        let keys: Vec<_> = hosts
            .iter()
            .map(|(target, _)| unsafe {
                HookManager::create_inline("member", *target as *const (), zero as *const ())
                    .unwrap()
                    .0
            })
            .collect();

        HookManager::register_group("test-group", keys.clone());
        assert_eq!(HookManager::is_group_enabled("test-group"), Some(false));

        HookManager::enable_group("test-group").unwrap();
        assert_eq!(HookManager::is_group_enabled("test-group"), Some(true));
        assert!(hosts.iter().all(|(_, f)| f(10) == 0));

        HookManager::disable_group("test-group").unwrap();
        assert!(hosts.iter().all(|(_, f)| f(10) == 25));

        HookManager::remove(keys[0].into()).unwrap();
        assert_eq!(HookManager::group("test-group").unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_group() {
        assert!(matches!(
            HookManager::enable_group("no-such-group"),
            Err(HookError::NotFound)
        ));
        assert_eq!(HookManager::is_group_enabled("no-such-group"), None);
    }

    #[test]
    fn test_mid_hooks_cannot_be_removed() {
        let (target, _) = host_fn();
        let key = unsafe { HookManager::create_mid("permanent", target, 6, None).unwrap() };

        assert!(HookManager::is_enabled(key.into()));
        assert!(HookManager::enable(key.into()).is_ok());
        assert!(matches!(
            HookManager::remove(key.into()),
            Err(HookError::Permanent)
        ));
    }
}
