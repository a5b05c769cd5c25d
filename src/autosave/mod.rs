//! Debounced auto-save as an explicit state machine.
//!
//! The machine never touches timers or the network itself. Each input returns
//! the effect the host must carry out (arm a timer, persist a snapshot,
//! refresh a listing) and every async completion is fed back in with the
//! token it was issued with. Stale timers and superseded responses are
//! recognised by those tokens and ignored.

use crate::content::ContentNode;
use crate::models::DocumentPatch;
use tracing::{debug, info, warn};

pub const DEFAULT_DEBOUNCE_MS: u32 = 2000;

/// Everything auto-save persists, always sent whole.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub title: String,
    pub icon: Option<String>,
    pub content: ContentNode,
}

impl Snapshot {
    pub fn to_patch(&self) -> DocumentPatch {
        DocumentPatch {
            title: Some(self.title.clone()),
            // An empty icon clears a stored one.
            icon: Some(self.icon.clone().unwrap_or_default()),
            content: Some(self.content.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveState {
    /// Freshly loaded; the next change is the initial assignment and is not saved.
    SuppressedInitialLoad,
    Idle,
    /// Dirty, waiting for the debounce window to elapse.
    PendingEdit,
    /// A save request is in flight.
    Saving,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaveRequest {
    pub seq: u64,
    pub document_id: String,
    pub patch: DocumentPatch,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AutosaveEffect {
    /// (Re)start the debounce timer; report back with `timer_elapsed(generation)`.
    ArmTimer { generation: u64, delay_ms: u32 },
    /// Send the request; report back with `save_succeeded`/`save_failed(seq, ..)`.
    Persist(SaveRequest),
    /// Reload listings that show this document's title or icon.
    RefreshListing,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    seq: u64,
    generation: u64,
}

#[derive(Clone, Debug)]
pub struct AutosaveMachine {
    debounce_ms: u32,
    document_id: Option<String>,
    state: SaveState,
    snapshot: Option<Snapshot>,
    dirty: bool,
    /// Bumped on every accepted edit and on every reset, so only the newest
    /// timer can fire a save.
    generation: u64,
    /// Generation of the one debounce timer still allowed to fire.
    armed: Option<u64>,
    next_seq: u64,
    in_flight: Option<InFlight>,
    last_saved_ms: Option<i64>,
    last_error: Option<String>,
}

impl Default for AutosaveMachine {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl AutosaveMachine {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            document_id: None,
            state: SaveState::Idle,
            snapshot: None,
            dirty: false,
            generation: 0,
            armed: None,
            next_seq: 1,
            in_flight: None,
            last_saved_ms: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_saving(&self) -> bool {
        self.state == SaveState::Saving
    }

    pub fn last_saved_ms(&self) -> Option<i64> {
        self.last_saved_ms
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start tracking `document_id`. Also used when switching documents:
    /// nothing carries over from the previous one.
    pub fn load(&mut self, document_id: impl Into<String>) {
        let document_id = document_id.into();
        debug!(%document_id, "autosave: document loaded");
        self.reset();
        self.document_id = Some(document_id);
        self.state = SaveState::SuppressedInitialLoad;
    }

    /// Stop tracking; pending timers and in-flight responses become stale.
    pub fn reset(&mut self) {
        self.document_id = None;
        self.state = SaveState::Idle;
        self.snapshot = None;
        self.dirty = false;
        self.generation += 1;
        self.armed = None;
        self.in_flight = None;
        self.last_saved_ms = None;
        self.last_error = None;
    }

    /// A title, icon or content change.
    pub fn record_edit(&mut self, snapshot: Snapshot) -> Option<AutosaveEffect> {
        self.document_id.as_ref()?;

        if self.state == SaveState::SuppressedInitialLoad {
            self.state = SaveState::Idle;
            self.snapshot = Some(snapshot);
            return None;
        }

        if self.snapshot.as_ref() == Some(&snapshot) {
            return None;
        }

        self.snapshot = Some(snapshot);
        self.dirty = true;
        self.generation += 1;
        self.armed = Some(self.generation);
        if self.state != SaveState::Saving {
            self.state = SaveState::PendingEdit;
        }

        Some(AutosaveEffect::ArmTimer {
            generation: self.generation,
            delay_ms: self.debounce_ms,
        })
    }

    /// Each armed timer fires at most one save.
    pub fn timer_elapsed(&mut self, generation: u64) -> Option<AutosaveEffect> {
        if self.armed != Some(generation) || generation != self.generation {
            return None;
        }
        self.armed = None;
        if !self.dirty {
            return None;
        }
        self.issue_save()
    }

    /// Persist the current snapshot right away, edited or not. An armed timer
    /// is superseded.
    pub fn save_now(&mut self) -> Option<AutosaveEffect> {
        if self.state == SaveState::SuppressedInitialLoad || self.snapshot.is_none() {
            return None;
        }
        self.generation += 1;
        self.armed = None;
        self.issue_save()
    }

    fn issue_save(&mut self) -> Option<AutosaveEffect> {
        let document_id = self.document_id.clone()?;
        let snapshot = self.snapshot.as_ref()?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some(InFlight {
            seq,
            generation: self.generation,
        });
        self.state = SaveState::Saving;
        debug!(%document_id, seq, "autosave: saving");

        Some(AutosaveEffect::Persist(SaveRequest {
            seq,
            document_id,
            patch: snapshot.to_patch(),
        }))
    }

    pub fn save_succeeded(&mut self, seq: u64, now_ms: i64) -> Option<AutosaveEffect> {
        let flight = self.take_in_flight(seq)?;
        self.last_saved_ms = Some(now_ms);
        self.last_error = None;

        if flight.generation == self.generation {
            self.dirty = false;
            self.state = SaveState::Idle;
        } else {
            // Edited while the request was out; that edit's timer is already armed.
            self.state = SaveState::PendingEdit;
        }
        info!(seq, "autosave: saved");
        Some(AutosaveEffect::RefreshListing)
    }

    /// Not retried; the next edit (if any) schedules the next attempt.
    pub fn save_failed(&mut self, seq: u64, error: &str) {
        let Some(flight) = self.take_in_flight(seq) else {
            return;
        };
        warn!(seq, error, "autosave: save failed");
        self.last_error = Some(error.to_string());
        self.state = if flight.generation == self.generation {
            SaveState::Idle
        } else {
            SaveState::PendingEdit
        };
    }

    fn take_in_flight(&mut self, seq: u64) -> Option<InFlight> {
        match self.in_flight {
            Some(flight) if flight.seq == seq => self.in_flight.take(),
            _ => {
                debug!(seq, "autosave: ignoring superseded response");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(title: &str) -> Snapshot {
        Snapshot {
            title: title.to_string(),
            icon: None,
            content: ContentNode::empty_doc(),
        }
    }

    fn loaded() -> AutosaveMachine {
        let mut m = AutosaveMachine::new(2000);
        m.load("d1");
        assert_eq!(m.record_edit(snap("T")), None);
        m
    }

    fn arm(effect: Option<AutosaveEffect>) -> u64 {
        match effect {
            Some(AutosaveEffect::ArmTimer { generation, delay_ms }) => {
                assert_eq!(delay_ms, 2000);
                generation
            }
            other => panic!("expected ArmTimer, got {other:?}"),
        }
    }

    fn persist(effect: Option<AutosaveEffect>) -> SaveRequest {
        match effect {
            Some(AutosaveEffect::Persist(req)) => req,
            other => panic!("expected Persist, got {other:?}"),
        }
    }

    #[test]
    fn test_load_without_edits_never_saves() {
        let mut m = AutosaveMachine::new(2000);
        m.load("d1");
        assert_eq!(m.state(), SaveState::SuppressedInitialLoad);
        // Initial content assignment is swallowed.
        assert_eq!(m.record_edit(snap("T")), None);
        assert_eq!(m.state(), SaveState::Idle);
        for generation in 0..5 {
            assert_eq!(m.timer_elapsed(generation), None);
        }
        assert!(!m.is_dirty());
    }

    #[test]
    fn test_single_edit_saves_once_with_latest_snapshot() {
        let mut m = loaded();
        let generation = arm(m.record_edit(snap("Renamed")));
        assert_eq!(m.state(), SaveState::PendingEdit);

        let req = persist(m.timer_elapsed(generation));
        assert_eq!(req.document_id, "d1");
        assert_eq!(req.patch.title.as_deref(), Some("Renamed"));
        assert_eq!(req.patch.content, Some(ContentNode::empty_doc()));
        assert!(m.is_saving());

        // The same timer cannot fire twice.
        assert_eq!(m.timer_elapsed(generation), None);

        assert_eq!(
            m.save_succeeded(req.seq, 1_000),
            Some(AutosaveEffect::RefreshListing)
        );
        assert_eq!(m.state(), SaveState::Idle);
        assert!(!m.is_dirty());
        assert_eq!(m.last_saved_ms(), Some(1_000));
    }

    #[test]
    fn test_rapid_edits_coalesce_into_one_save() {
        let mut m = loaded();
        let mut generations = Vec::new();
        for i in 0..5 {
            generations.push(arm(m.record_edit(snap(&format!("T{i}")))));
        }
        let (last, stale) = generations.split_last().expect("five edits");
        for g in stale {
            assert_eq!(m.timer_elapsed(*g), None);
        }
        let req = persist(m.timer_elapsed(*last));
        assert_eq!(req.patch.title.as_deref(), Some("T4"));
        assert_eq!(m.timer_elapsed(*last), None);
    }

    #[test]
    fn test_identical_snapshot_is_not_an_edit() {
        let mut m = loaded();
        assert_eq!(m.record_edit(snap("T")), None);
        assert!(!m.is_dirty());
    }

    #[test]
    fn test_edit_during_save_keeps_dirty_and_reschedules() {
        let mut m = loaded();
        let g1 = arm(m.record_edit(snap("A")));
        let req1 = persist(m.timer_elapsed(g1));

        let g2 = arm(m.record_edit(snap("AB")));
        assert_eq!(m.state(), SaveState::Saving);

        assert_eq!(
            m.save_succeeded(req1.seq, 10),
            Some(AutosaveEffect::RefreshListing)
        );
        assert!(m.is_dirty());
        assert_eq!(m.state(), SaveState::PendingEdit);

        let req2 = persist(m.timer_elapsed(g2));
        assert_eq!(req2.patch.title.as_deref(), Some("AB"));
        assert!(req2.seq > req1.seq);
    }

    #[test]
    fn test_superseded_response_is_ignored() {
        let mut m = loaded();
        let g1 = arm(m.record_edit(snap("A")));
        let req1 = persist(m.timer_elapsed(g1));
        let g2 = arm(m.record_edit(snap("AB")));
        let req2 = persist(m.timer_elapsed(g2));

        // The older request answers late.
        assert_eq!(m.save_succeeded(req1.seq, 5), None);
        assert!(m.is_saving());
        assert_eq!(m.last_saved_ms(), None);

        m.save_failed(req1.seq, "late failure");
        assert_eq!(m.last_error(), None);

        m.save_succeeded(req2.seq, 6);
        assert_eq!(m.last_saved_ms(), Some(6));
        assert!(!m.is_dirty());
    }

    #[test]
    fn test_failure_is_not_retried() {
        let mut m = loaded();
        let g = arm(m.record_edit(snap("A")));
        let req = persist(m.timer_elapsed(g));
        m.save_failed(req.seq, "network error");

        assert_eq!(m.state(), SaveState::Idle);
        assert!(!m.is_saving());
        assert!(m.is_dirty());
        assert_eq!(m.last_error(), Some("network error"));
        assert_eq!(m.timer_elapsed(g), None);

        // The next edit governs the next attempt.
        let g2 = arm(m.record_edit(snap("AB")));
        let req2 = persist(m.timer_elapsed(g2));
        assert_eq!(req2.patch.title.as_deref(), Some("AB"));
    }

    #[test]
    fn test_save_now_supersedes_armed_timer() {
        let mut m = loaded();
        let g = arm(m.record_edit(snap("A")));
        let req = persist(m.save_now());
        assert_eq!(req.patch.title.as_deref(), Some("A"));
        assert_eq!(m.timer_elapsed(g), None);

        m.save_succeeded(req.seq, 3);
        assert!(!m.is_dirty());
        assert_eq!(m.state(), SaveState::Idle);
    }

    #[test]
    fn test_save_now_without_edits_still_saves() {
        let mut m = AutosaveMachine::new(2000);
        m.load("d1");
        assert_eq!(m.save_now(), None);
        m.record_edit(snap("T"));
        let req = persist(m.save_now());
        assert_eq!(req.patch.title.as_deref(), Some("T"));
    }

    #[test]
    fn test_switching_documents_resets_everything() {
        let mut m = loaded();
        let g = arm(m.record_edit(snap("A")));
        let req = persist(m.timer_elapsed(g));

        m.load("d2");
        assert_eq!(m.state(), SaveState::SuppressedInitialLoad);
        assert!(!m.is_dirty());
        assert_eq!(m.document_id(), Some("d2"));

        // Responses and timers from the old document are stale.
        assert_eq!(m.save_succeeded(req.seq, 1), None);
        assert_eq!(m.last_saved_ms(), None);
        assert_eq!(m.timer_elapsed(g), None);

        // First assignment on the new document is suppressed again.
        assert_eq!(m.record_edit(snap("B")), None);
    }

    #[test]
    fn test_timer_fires_once_even_after_failure() {
        let mut m = loaded();
        let g = arm(m.record_edit(snap("A")));
        let req = persist(m.timer_elapsed(g));
        assert_eq!(m.timer_elapsed(g), None);

        m.save_failed(req.seq, "offline");
        assert!(m.is_dirty());
        assert_eq!(m.timer_elapsed(g), None);
        assert_eq!(m.state(), SaveState::Idle);
    }

    #[test]
    fn test_reset_disarms_pending_timer() {
        let mut m = loaded();
        let g = arm(m.record_edit(snap("A")));
        m.reset();
        m.load("d1");
        m.record_edit(snap("A"));
        assert_eq!(m.timer_elapsed(g), None);
        assert_eq!(m.timer_elapsed(g + 1), None);
    }

    #[test]
    fn test_edits_without_document_are_ignored() {
        let mut m = AutosaveMachine::default();
        assert_eq!(m.record_edit(snap("A")), None);
        assert_eq!(m.timer_elapsed(0), None);
    }

    #[test]
    fn test_snapshot_patch_clears_missing_icon() {
        let patch = snap("T").to_patch();
        assert_eq!(patch.icon.as_deref(), Some(""));
    }
}
