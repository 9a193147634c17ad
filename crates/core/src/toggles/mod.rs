//! Key-bound feature toggles
//!
//! Each toggle is bound to a key. Polling is debounced: a poll that comes less
//! than the debounce interval after the last change does nothing, so a held
//! key flips its toggle once per interval rather than once per frame.
//! Side effects of a flip come from a [`TransitionTable`] and run before
//! [`ToggleRegistry::poll`] returns.

mod transitions;

pub use transitions::{Effect, EffectSink, HookGroupEffects, Transition, TransitionTable};

use crate::hooks::HookError;
use crate::input::KeySource;

/// Default debounce interval
pub const DEBOUNCE_MS: u64 = 250;

/// A named on/off switch bound to a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggle {
    name: String,
    key: u8,
    enabled: bool,
}

impl Toggle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// All toggles plus the effects their changes cause
#[derive(Debug, Clone)]
pub struct ToggleRegistry {
    toggles: Vec<Toggle>,
    transitions: TransitionTable,
    debounce_ms: u64,
}

impl Default for ToggleRegistry {
    fn default() -> Self {
        Self::new(DEBOUNCE_MS)
    }
}

impl ToggleRegistry {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            toggles: Vec::new(),
            transitions: TransitionTable::new(),
            debounce_ms,
        }
    }

    /// Add a toggle, initially disabled
    pub fn register(mut self, name: &str, key: u8) -> Self {
        self.toggles.push(Toggle {
            name: name.to_string(),
            key,
            enabled: false,
        });
        self
    }

    pub fn with_transitions(mut self, transitions: TransitionTable) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }

    /// Flip every toggle whose key is held
    ///
    /// Does nothing when `elapsed_ms` (time since the last change) is below
    /// the debounce interval. A toggle only flips once all of its effects have
    /// been applied; if one fails, the effects already applied are undone and
    /// the toggle keeps its state. Returns whether anything changed.
    pub fn poll(
        &mut self,
        elapsed_ms: u64,
        keys: &dyn KeySource,
        sink: &mut dyn EffectSink,
    ) -> bool {
        if elapsed_ms < self.debounce_ms {
            return false;
        }

        let mut changed = false;
        for toggle in &mut self.toggles {
            if !keys.is_pressed(toggle.key) {
                continue;
            }

            let transition = Transition::to(!toggle.enabled);
            let effects: Vec<&Effect> = self.transitions.effects(&toggle.name, transition).collect();
            if let Err(err) = apply_all(&effects, sink) {
                tracing::error!("'{}' not switched, side effect failed: {}", toggle.name, err);
                continue;
            }

            toggle.enabled = !toggle.enabled;
            changed = true;

            tracing::info!(
                target: "strafe::status",
                "{}: {}",
                toggle.name,
                if toggle.enabled { "ON" } else { "OFF" }
            );
        }

        changed
    }

    /// Whether `name` is enabled; unknown names are disabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.toggles
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.enabled)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toggle> {
        self.toggles.iter()
    }
}

/// Apply `effects` in order; on failure, undo the ones already applied
fn apply_all(effects: &[&Effect], sink: &mut dyn EffectSink) -> Result<(), HookError> {
    for (applied, effect) in effects.iter().enumerate() {
        if let Err(err) = sink.apply(effect) {
            for done in effects[..applied].iter().rev() {
                if let Err(undo) = sink.apply(&done.inverse()) {
                    tracing::error!("Failed to undo {:?}: {}", done, undo);
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tests::HeldKeys;

    const KEY: u8 = 0x74;

    #[derive(Default)]
    struct RecordingSink(Vec<Effect>);

    impl EffectSink for RecordingSink {
        fn apply(&mut self, effect: &Effect) -> Result<(), HookError> {
            self.0.push(effect.clone());
            Ok(())
        }
    }

    fn registry() -> ToggleRegistry {
        let transitions = TransitionTable::new()
            .on("feature", Transition::Enable, Effect::EnableGroup("g".into()))
            .on("feature", Transition::Disable, Effect::DisableGroup("g".into()));

        ToggleRegistry::default()
            .register("feature", KEY)
            .with_transitions(transitions)
    }

    #[test]
    fn test_poll_below_debounce_is_noop() {
        let mut toggles = registry();
        let mut sink = RecordingSink::default();
        let held = HeldKeys::holding(KEY);

        assert!(!toggles.poll(100, &held, &mut sink));
        assert!(!toggles.poll(249, &held, &mut sink));
        assert!(!toggles.is_enabled("feature"));
        assert!(sink.0.is_empty());
    }

    #[test]
    fn test_poll_flips_once_per_call() {
        let mut toggles = registry();
        let mut sink = RecordingSink::default();
        let held = HeldKeys::holding(KEY);

        // A long hold is still one flip per poll
        assert!(toggles.poll(10_000, &held, &mut sink));
        assert!(toggles.is_enabled("feature"));
        assert_eq!(sink.0, vec![Effect::EnableGroup("g".into())]);

        assert!(toggles.poll(250, &held, &mut sink));
        assert!(!toggles.is_enabled("feature"));
        assert_eq!(sink.0[1], Effect::DisableGroup("g".into()));
    }

    #[test]
    fn test_poll_without_key() {
        let mut toggles = registry();
        let mut sink = RecordingSink::default();

        assert!(!toggles.poll(1000, &HeldKeys::none(), &mut sink));
        assert!(!toggles.is_enabled("feature"));
    }

    #[test]
    fn test_unknown_name_is_disabled() {
        assert!(!registry().is_enabled("no such toggle"));
    }

    #[test]
    fn test_independent_keys() {
        let mut toggles = ToggleRegistry::default()
            .register("a", 0x74)
            .register("b", 0x75);
        let mut sink = RecordingSink::default();

        toggles.poll(300, &HeldKeys::holding(0x75), &mut sink);

        assert!(!toggles.is_enabled("a"));
        assert!(toggles.is_enabled("b"));
        assert!(sink.0.is_empty());
    }

    #[test]
    fn test_transition_table_lookup() {
        let table = TransitionTable::new()
            .on("x", Transition::Enable, Effect::EnableGroup("one".into()))
            .on("x", Transition::Enable, Effect::EnableGroup("two".into()))
            .on("y", Transition::Enable, Effect::EnableGroup("three".into()));

        let effects: Vec<_> = table.effects("x", Transition::Enable).collect();
        assert_eq!(effects.len(), 2);
        assert_eq!(table.effects("x", Transition::Disable).count(), 0);
        assert_eq!(table.len(), 3);
    }

    /// Fails every effect naming `bad`, records the rest
    struct FailingSink {
        bad: &'static str,
        applied: Vec<Effect>,
    }

    impl EffectSink for FailingSink {
        fn apply(&mut self, effect: &Effect) -> Result<(), HookError> {
            let (Effect::EnableGroup(group) | Effect::DisableGroup(group)) = effect;
            if group == self.bad {
                return Err(HookError::NotFound);
            }
            self.applied.push(effect.clone());
            Ok(())
        }
    }

    #[test]
    fn test_failed_effect_keeps_toggle_state() {
        let mut toggles = registry();
        let mut sink = FailingSink {
            bad: "g",
            applied: Vec::new(),
        };

        assert!(!toggles.poll(300, &HeldKeys::holding(KEY), &mut sink));
        assert!(!toggles.is_enabled("feature"));
        assert!(sink.applied.is_empty());
    }

    #[test]
    fn test_failed_effect_undoes_earlier_effects() {
        let transitions = TransitionTable::new()
            .on("feature", Transition::Enable, Effect::EnableGroup("first".into()))
            .on("feature", Transition::Enable, Effect::EnableGroup("second".into()));
        let mut toggles = ToggleRegistry::default()
            .register("feature", KEY)
            .with_transitions(transitions);
        let mut sink = FailingSink {
            bad: "second",
            applied: Vec::new(),
        };

        assert!(!toggles.poll(300, &HeldKeys::holding(KEY), &mut sink));
        assert!(!toggles.is_enabled("feature"));
        assert_eq!(
            sink.applied,
            vec![
                Effect::EnableGroup("first".into()),
                Effect::DisableGroup("first".into())
            ]
        );
    }
}
