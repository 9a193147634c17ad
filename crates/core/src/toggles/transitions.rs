//! Declarative side effects of toggle changes

use crate::hooks::{HookError, HookManager};

/// Direction of a toggle change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Disabled → Enabled
    Enable,
    /// Enabled → Disabled
    Disable,
}

impl Transition {
    /// Transition that ends in `enabled`
    pub fn to(enabled: bool) -> Self {
        if enabled {
            Transition::Enable
        } else {
            Transition::Disable
        }
    }
}

/// Something a toggle change causes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    EnableGroup(String),
    DisableGroup(String),
}

impl Effect {
    /// The effect that undoes this one
    pub fn inverse(&self) -> Effect {
        match self {
            Effect::EnableGroup(group) => Effect::DisableGroup(group.clone()),
            Effect::DisableGroup(group) => Effect::EnableGroup(group.clone()),
        }
    }
}

/// Carries out effects
pub trait EffectSink {
    fn apply(&mut self, effect: &Effect) -> Result<(), HookError>;
}

/// Applies effects to the global hook manager
#[derive(Debug, Default, Clone, Copy)]
pub struct HookGroupEffects;

impl EffectSink for HookGroupEffects {
    fn apply(&mut self, effect: &Effect) -> Result<(), HookError> {
        match effect {
            Effect::EnableGroup(group) => HookManager::enable_group(group),
            Effect::DisableGroup(group) => HookManager::disable_group(group),
        }
    }
}

/// Effects to run when a named toggle makes a transition
#[derive(Debug, Default, Clone)]
pub struct TransitionTable {
    rows: Vec<(String, Transition, Effect)>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row: when `toggle` makes `transition`, run `effect`
    pub fn on(mut self, toggle: &str, transition: Transition, effect: Effect) -> Self {
        self.rows.push((toggle.to_string(), transition, effect));
        self
    }

    /// Effects for one transition, in insertion order
    pub fn effects<'a>(
        &'a self,
        toggle: &'a str,
        transition: Transition,
    ) -> impl Iterator<Item = &'a Effect> + 'a {
        self.rows
            .iter()
            .filter(move |(name, t, _)| name == toggle && *t == transition)
            .map(|(_, _, effect)| effect)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
