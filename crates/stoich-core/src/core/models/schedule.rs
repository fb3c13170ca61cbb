use std::collections::HashMap;

/// The scheduler slot an object is processed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tick {
    /// Processed by the generic scheduler on the given clock tick.
    Slot(u32),
    /// Taken off the generic scheduler, with the option to resurrect it later.
    Disabled,
}

impl Tick {
    pub fn is_disabled(self) -> bool {
        self == Tick::Disabled
    }
}

/// Conventional clock ticks for each kind of model object.
///
/// Objects are created on their kind's default tick, and a compiled reaction system
/// restores that tick when it hands an object back to native control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRegistry {
    default_ticks: HashMap<String, u32>,
    fallback: u32,
}

impl Default for ScheduleRegistry {
    fn default() -> Self {
        let default_ticks = [
            ("Function", 12),
            ("Reac", 14),
            ("Enz", 14),
            ("MMenz", 14),
            ("Pool", 16),
            ("BufPool", 16),
        ]
        .into_iter()
        .map(|(class, tick)| (class.to_string(), tick))
        .collect();

        Self {
            default_ticks,
            fallback: 0,
        }
    }
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the default tick of an object class.
    pub fn set_default_tick(&mut self, class: &str, tick: u32) {
        self.default_ticks.insert(class.to_string(), tick);
    }

    /// Looks up the conventional tick of an object class.
    pub fn default_tick(&self, class: &str) -> Tick {
        Tick::Slot(
            self.default_ticks
                .get(class)
                .copied()
                .unwrap_or(self.fallback),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_classes_have_conventional_ticks() {
        let registry = ScheduleRegistry::default();
        assert_eq!(registry.default_tick("Function"), Tick::Slot(12));
        assert_eq!(registry.default_tick("Reac"), Tick::Slot(14));
        assert_eq!(registry.default_tick("BufPool"), Tick::Slot(16));
    }

    #[test]
    fn unknown_class_uses_fallback_tick() {
        let registry = ScheduleRegistry::default();
        assert_eq!(registry.default_tick("Table"), Tick::Slot(0));
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut registry = ScheduleRegistry::new();
        registry.set_default_tick("Reac", 9);
        assert_eq!(registry.default_tick("Reac"), Tick::Slot(9));
        assert!(!registry.default_tick("Reac").is_disabled());
    }
}
