//! Local mirror of the `hospitals/` tree, updated from store snapshots.

use arc_swap::ArcSwap;
use bedboard_core::{HospitalCollection, HospitalId};
use std::sync::Arc;

/// Immutable view over the mirrored tree plus the operator's selection.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Full mirrored collection, in feed (key) order.
    pub hospitals: HospitalCollection,
    /// Currently selected hospital, if any.
    pub selected: Option<HospitalId>,
    /// Set while the subscription feed is failing; cleared by the next snapshot.
    pub feed_error: Option<String>,
}

impl ViewState {
    pub fn selected_record(&self) -> Option<&bedboard_core::HospitalRecord> {
        self.selected.as_ref().and_then(|id| self.hospitals.get(id))
    }
}

/// Single-writer holder for the current [`ViewState`].
///
/// The subscriber task is the only writer for snapshots and feed errors;
/// selection changes come from the command loop. Both go through `rcu` so
/// readers always see a complete state.
#[derive(Debug, Default)]
pub struct HospitalMirror {
    state: ArcSwap<ViewState>,
}

impl HospitalMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the mirrored collection wholesale with a fresh snapshot.
    ///
    /// The selection is kept if the selected hospital still exists, otherwise
    /// it falls back to the first key in the snapshot, or to none when the
    /// snapshot is empty. Any feed error is cleared: a snapshot means the
    /// feed recovered.
    pub fn apply_snapshot(&self, hospitals: HospitalCollection) {
        self.state.rcu(|state| {
            let selected = match &state.selected {
                Some(id) if hospitals.contains_key(id) => Some(id.clone()),
                _ => hospitals.keys().next().cloned(),
            };
            Arc::new(ViewState {
                hospitals: hospitals.clone(),
                selected,
                feed_error: None,
            })
        });
    }

    /// Records a persistent feed error. The stale collection is kept so the
    /// operator can still see the last known data.
    pub fn apply_read_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.rcu(|state| {
            Arc::new(ViewState {
                hospitals: state.hospitals.clone(),
                selected: state.selected.clone(),
                feed_error: Some(message.clone()),
            })
        });
    }

    /// Selects a hospital by id. The id is recorded even if it is absent from
    /// the current snapshot; a later snapshot containing it will surface it.
    pub fn select(&self, id: impl Into<HospitalId>) {
        let id = id.into();
        self.state.rcu(|state| {
            Arc::new(ViewState {
                hospitals: state.hospitals.clone(),
                selected: Some(id.clone()),
                feed_error: state.feed_error.clone(),
            })
        });
    }

    pub fn load(&self) -> Arc<ViewState> {
        self.state.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedboard_core::HospitalRecord;

    fn collection(ids: &[&str]) -> HospitalCollection {
        ids.iter()
            .map(|id| {
                (
                    (*id).to_string(),
                    HospitalRecord::new(format!("{id} Medical Center"), 10).with_occupied(6),
                )
            })
            .collect()
    }

    #[test]
    fn test_first_snapshot_selects_first_key() {
        let mirror = HospitalMirror::new();
        mirror.apply_snapshot(collection(&["h1", "h2"]));

        let state = mirror.load();
        assert_eq!(state.hospitals.len(), 2);
        assert_eq!(state.selected.as_deref(), Some("h1"));
    }

    #[test]
    fn test_selection_survives_snapshot() {
        let mirror = HospitalMirror::new();
        mirror.apply_snapshot(collection(&["h1", "h2", "h3"]));
        mirror.select("h2");

        mirror.apply_snapshot(collection(&["h1", "h2", "h3"]));
        assert_eq!(mirror.load().selected.as_deref(), Some("h2"));
    }

    #[test]
    fn test_selection_falls_back_when_hospital_disappears() {
        let mirror = HospitalMirror::new();
        mirror.apply_snapshot(collection(&["h1", "h2"]));
        mirror.select("h2");

        mirror.apply_snapshot(collection(&["h1", "h3"]));
        assert_eq!(mirror.load().selected.as_deref(), Some("h1"));
    }

    #[test]
    fn test_empty_snapshot_clears_selection() {
        let mirror = HospitalMirror::new();
        mirror.apply_snapshot(collection(&["h1"]));
        mirror.apply_snapshot(HospitalCollection::default());

        let state = mirror.load();
        assert!(state.hospitals.is_empty());
        assert!(state.selected.is_none());
    }

    #[test]
    fn test_read_error_keeps_stale_data_and_snapshot_clears_it() {
        let mirror = HospitalMirror::new();
        mirror.apply_snapshot(collection(&["h1"]));

        mirror.apply_read_error("permission denied");
        let state = mirror.load();
        assert_eq!(state.feed_error.as_deref(), Some("permission denied"));
        assert_eq!(state.hospitals.len(), 1);

        mirror.apply_snapshot(collection(&["h1", "h2"]));
        let state = mirror.load();
        assert!(state.feed_error.is_none());
        assert_eq!(state.hospitals.len(), 2);
    }

    #[test]
    fn test_select_absent_id_is_recorded() {
        let mirror = HospitalMirror::new();
        mirror.apply_snapshot(collection(&["h1"]));
        mirror.select("h9");

        let state = mirror.load();
        assert_eq!(state.selected.as_deref(), Some("h9"));
        assert!(state.selected_record().is_none());
    }
}
