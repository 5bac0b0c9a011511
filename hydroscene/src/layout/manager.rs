//! Layout manager.
//!
//! Holds the defined layouts and the single active one. Activation checks
//! every slot against the display registry; afterwards slot occupants may
//! go offline or disappear without the layout changing. Such slots show up
//! as gaps in [`LayoutManager::targets`] until an operator replaces them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::types::{Layout, LayoutId, LayoutSpec};
use crate::display::{DisplayId, DisplayRegistry};
use crate::error::ControlError;

/// The installed layout and its slot assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLayout {
    pub layout: Layout,
    /// Display per slot, indexed by slot number.
    pub slots: Vec<DisplayId>,
    pub activated_at: DateTime<Utc>,
}

/// Persisted form of the active layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLayout {
    pub spec: LayoutSpec,
    pub assignment: Vec<DisplayId>,
}

/// Reachability of a slot occupant at the time of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Online,
    Offline,
    /// The display was unregistered after activation.
    Missing,
}

/// One slot of the active layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTarget {
    pub slot: usize,
    pub display: DisplayId,
    pub state: SlotState,
}

struct State {
    layouts: HashMap<LayoutId, Layout>,
    active: Option<ActiveLayout>,
}

/// Layout definitions plus the active layout.
#[derive(Clone)]
pub struct LayoutManager {
    registry: DisplayRegistry,
    state: Arc<RwLock<State>>,
}

impl LayoutManager {
    pub fn new(registry: DisplayRegistry) -> Self {
        Self {
            registry,
            state: Arc::new(RwLock::new(State {
                layouts: HashMap::new(),
                active: None,
            })),
        }
    }

    /// Validate and store a layout definition.
    pub fn create_layout(&self, spec: LayoutSpec) -> Result<Layout, ControlError> {
        let cells = spec.validate()?;
        let layout = Layout { spec, cells };

        let mut state = self.write()?;
        if state.layouts.contains_key(layout.id()) {
            return Err(ControlError::validation(format!(
                "layout '{}' already exists",
                layout.id()
            )));
        }

        info!(
            layout = %layout.id(),
            kind = layout.spec.arrangement.kind(),
            cells = layout.cell_count(),
            "Layout created"
        );
        state.layouts.insert(layout.id().clone(), layout.clone());
        Ok(layout)
    }

    /// Activate a layout, superseding the current one.
    ///
    /// `assignment[n]` is the display for slot `n`. Every display must be
    /// registered and advertise the layout (or `"*"`); offline displays are
    /// accepted and start out as gaps.
    pub fn activate_layout(
        &self,
        id: &LayoutId,
        assignment: Vec<DisplayId>,
    ) -> Result<ActiveLayout, ControlError> {
        let mut state = self.write()?;
        let layout = state
            .layouts
            .get(id)
            .cloned()
            .ok_or_else(|| ControlError::LayoutNotFound(id.clone()))?;

        if assignment.len() != layout.cell_count() {
            return Err(ControlError::validation(format!(
                "layout '{id}' has {} slots but {} displays were assigned",
                layout.cell_count(),
                assignment.len()
            )));
        }

        let mut seen = HashSet::new();
        for display in &assignment {
            if !seen.insert(display) {
                return Err(ControlError::validation(format!(
                    "display '{display}' is assigned to more than one slot"
                )));
            }
            self.check_display(display, id)?;
        }

        let active = ActiveLayout {
            layout,
            slots: assignment,
            activated_at: Utc::now(),
        };

        if let Some(previous) = &state.active {
            info!(previous = %previous.layout.id(), layout = %id, "Layout superseded");
        }
        info!(layout = %id, slots = ?active.slots, "Layout activated");
        state.active = Some(active.clone());
        Ok(active)
    }

    /// Put a different display into one slot of the active layout.
    pub fn replace_slot(&self, slot: usize, display_id: DisplayId) -> Result<ActiveLayout, ControlError> {
        let mut state = self.write()?;
        let active = state
            .active
            .as_mut()
            .ok_or_else(|| ControlError::validation("no layout is active"))?;

        if slot >= active.slots.len() {
            return Err(ControlError::validation(format!(
                "slot {slot} out of range for layout '{}' ({} slots)",
                active.layout.id(),
                active.slots.len()
            )));
        }
        if active
            .slots
            .iter()
            .enumerate()
            .any(|(n, d)| n != slot && *d == display_id)
        {
            return Err(ControlError::validation(format!(
                "display '{display_id}' already occupies another slot"
            )));
        }
        self.check_display(&display_id, active.layout.id())?;

        let replaced = std::mem::replace(&mut active.slots[slot], display_id.clone());
        info!(layout = %active.layout.id(), slot, %replaced, display = %display_id, "Layout slot replaced");
        Ok(active.clone())
    }

    /// Reinstall a persisted layout after restart.
    ///
    /// Displays are not checked: they reconnect with their stable ids after
    /// the core is up, and until then their slots are gaps.
    pub fn restore(&self, persisted: PersistedLayout) -> Result<ActiveLayout, ControlError> {
        let cells = persisted.spec.validate()?;
        let layout = Layout {
            spec: persisted.spec,
            cells,
        };
        if persisted.assignment.len() != layout.cell_count() {
            return Err(ControlError::validation(format!(
                "persisted layout '{}' has {} slots but {} assignments",
                layout.id(),
                layout.cell_count(),
                persisted.assignment.len()
            )));
        }

        let active = ActiveLayout {
            layout: layout.clone(),
            slots: persisted.assignment,
            activated_at: Utc::now(),
        };

        let mut state = self.write()?;
        state.layouts.insert(layout.id().clone(), layout);
        state.active = Some(active.clone());
        info!(layout = %active.layout.id(), "Active layout restored");
        Ok(active)
    }

    /// The active layout, if any.
    pub fn active(&self) -> Option<ActiveLayout> {
        self.state.read().ok().and_then(|s| s.active.clone())
    }

    /// Active layout in persistable form.
    pub fn persisted(&self) -> Option<PersistedLayout> {
        self.active().map(|a| PersistedLayout {
            spec: a.layout.spec,
            assignment: a.slots,
        })
    }

    /// Slots of the active layout with their current reachability.
    pub fn targets(&self) -> Vec<SlotTarget> {
        let Some(active) = self.active() else {
            return Vec::new();
        };
        active
            .slots
            .into_iter()
            .enumerate()
            .map(|(slot, display)| {
                let state = match self.registry.get(&display) {
                    Some(d) if d.is_online() => SlotState::Online,
                    Some(_) => SlotState::Offline,
                    None => SlotState::Missing,
                };
                SlotTarget {
                    slot,
                    display,
                    state,
                }
            })
            .collect()
    }

    /// Returns true if the display occupies a slot of the active layout.
    pub fn occupies_slot(&self, display: &DisplayId) -> bool {
        self.state
            .read()
            .map(|s| {
                s.active
                    .as_ref()
                    .is_some_and(|a| a.slots.iter().any(|d| d == display))
            })
            .unwrap_or(false)
    }

    pub fn get(&self, id: &LayoutId) -> Option<Layout> {
        self.state.read().ok().and_then(|s| s.layouts.get(id).cloned())
    }

    /// All defined layouts, sorted by id.
    pub fn layouts(&self) -> Vec<Layout> {
        let mut layouts: Vec<Layout> = self
            .state
            .read()
            .map(|s| s.layouts.values().cloned().collect())
            .unwrap_or_default();
        layouts.sort_by(|a, b| a.id().cmp(b.id()));
        layouts
    }

    fn check_display(&self, display_id: &DisplayId, layout: &LayoutId) -> Result<(), ControlError> {
        let registered = self
            .registry
            .get(display_id)
            .ok_or_else(|| ControlError::DisplayNotFound(display_id.clone()))?;
        if !registered.supports(layout) {
            warn!(display = %display_id, %layout, capabilities = ?registered.capabilities, "Display lacks layout capability");
            return Err(ControlError::IncompatibleDisplay {
                display: display_id.clone(),
                layout: layout.clone(),
            });
        }
        Ok(())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, ControlError> {
        self.state
            .write()
            .map_err(|_| ControlError::validation("layout state unavailable"))
    }
}

impl std::fmt::Debug for LayoutManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutManager")
            .field("active", &self.active().map(|a| a.layout.spec.id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::display::{DisplayDescriptor, DisplayRegistryConfig, Resolution};
    use std::time::Duration;

    fn setup() -> (LayoutManager, DisplayRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let registry = DisplayRegistry::new(DisplayRegistryConfig::default(), clock.clone());
        (LayoutManager::new(registry.clone()), registry, clock)
    }

    fn register(registry: &DisplayRegistry, id: &str, capability: &str) -> DisplayId {
        registry
            .register_display(
                DisplayDescriptor::new(id, Resolution::new(1920, 1080))
                    .with_id(id)
                    .with_capability(capability),
            )
            .unwrap()
    }

    fn ids(names: &[&str]) -> Vec<DisplayId> {
        names.iter().map(|n| DisplayId::new(*n)).collect()
    }

    #[test]
    fn test_duplicate_layout_rejected() {
        let (manager, _, _) = setup();
        manager.create_layout(LayoutSpec::grid("wall", 2, 2)).unwrap();
        assert!(matches!(
            manager.create_layout(LayoutSpec::linear("wall", 2)),
            Err(ControlError::Validation(_))
        ));
    }

    #[test]
    fn test_activate_unknown_layout() {
        let (manager, _, _) = setup();
        let err = manager
            .activate_layout(&LayoutId::new("nope"), Vec::new())
            .unwrap_err();
        assert_eq!(err, ControlError::LayoutNotFound(LayoutId::new("nope")));
    }

    #[test]
    fn test_activate_checks_capabilities() {
        let (manager, registry, _) = setup();
        manager.create_layout(LayoutSpec::linear("strip", 2)).unwrap();
        register(&registry, "a", "strip");
        register(&registry, "b", "wall");

        let err = manager
            .activate_layout(&LayoutId::new("strip"), ids(&["a", "b"]))
            .unwrap_err();
        assert_eq!(
            err,
            ControlError::IncompatibleDisplay {
                display: DisplayId::new("b"),
                layout: LayoutId::new("strip"),
            }
        );
        assert!(manager.active().is_none());
    }

    #[test]
    fn test_activate_checks_slot_count_and_duplicates() {
        let (manager, registry, _) = setup();
        manager.create_layout(LayoutSpec::linear("strip", 2)).unwrap();
        register(&registry, "a", "*");

        assert!(matches!(
            manager.activate_layout(&LayoutId::new("strip"), ids(&["a"])),
            Err(ControlError::Validation(_))
        ));
        assert!(matches!(
            manager.activate_layout(&LayoutId::new("strip"), ids(&["a", "a"])),
            Err(ControlError::Validation(_))
        ));
        assert!(matches!(
            manager.activate_layout(&LayoutId::new("strip"), ids(&["a", "ghost"])),
            Err(ControlError::DisplayNotFound(_))
        ));
    }

    #[test]
    fn test_activation_supersedes_previous() {
        let (manager, registry, _) = setup();
        manager.create_layout(LayoutSpec::linear("strip", 1)).unwrap();
        manager.create_layout(LayoutSpec::linear("solo", 1)).unwrap();
        register(&registry, "a", "*");

        manager.activate_layout(&LayoutId::new("strip"), ids(&["a"])).unwrap();
        manager.activate_layout(&LayoutId::new("solo"), ids(&["a"])).unwrap();

        assert_eq!(manager.active().unwrap().layout.id().as_str(), "solo");
    }

    #[test]
    fn test_offline_display_keeps_slot_as_gap() {
        let (manager, registry, clock) = setup();
        manager.create_layout(LayoutSpec::grid("wall", 1, 2)).unwrap();
        let a = register(&registry, "a", "*");
        let b = register(&registry, "b", "*");
        manager
            .activate_layout(&LayoutId::new("wall"), vec![a.clone(), b.clone()])
            .unwrap();

        clock.advance(Duration::from_secs(20));
        registry.heartbeat(&a).unwrap();
        registry.sweep();

        let targets = manager.targets();
        assert_eq!(targets[0].state, SlotState::Online);
        assert_eq!(targets[1].state, SlotState::Offline);
        assert_eq!(targets[1].display, b);

        registry.unregister_display(&b).unwrap();
        assert_eq!(manager.targets()[1].state, SlotState::Missing);
        assert!(manager.occupies_slot(&b));
    }

    #[test]
    fn test_replace_slot() {
        let (manager, registry, _) = setup();
        manager.create_layout(LayoutSpec::linear("strip", 2)).unwrap();
        register(&registry, "a", "*");
        register(&registry, "b", "*");
        register(&registry, "c", "strip");
        manager
            .activate_layout(&LayoutId::new("strip"), ids(&["a", "b"]))
            .unwrap();

        let active = manager.replace_slot(1, DisplayId::new("c")).unwrap();
        assert_eq!(active.slots, ids(&["a", "c"]));

        assert!(manager.replace_slot(5, DisplayId::new("b")).is_err());
        assert!(manager.replace_slot(1, DisplayId::new("a")).is_err());
    }

    #[test]
    fn test_restore_skips_liveness_checks() {
        let (manager, _, _) = setup();
        let restored = manager
            .restore(PersistedLayout {
                spec: LayoutSpec::grid("wall", 1, 2),
                assignment: ids(&["a", "b"]),
            })
            .unwrap();

        assert_eq!(restored.slots.len(), 2);
        assert!(manager
            .targets()
            .iter()
            .all(|t| t.state == SlotState::Missing));
        assert!(manager.get(&LayoutId::new("wall")).is_some());
        assert_eq!(manager.persisted().unwrap().assignment, ids(&["a", "b"]));
    }
}
