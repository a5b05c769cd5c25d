use crate::autosave::{AutosaveEffect, AutosaveMachine, SaveRequest, Snapshot};
use crate::documents::DocumentTreeService;
use crate::state::AppContext;
use crate::util::now_ms;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use wasm_bindgen::JsCast;

/// Drives an [`AutosaveMachine`] with browser timers and backend calls.
///
/// One controller per open document page. The page reports every title,
/// icon or content change; the controller owns the debounce timer and the
/// save requests it leads to.
#[derive(Clone)]
pub(crate) struct AutosaveController {
    app_state: AppContext,
    machine: Arc<Mutex<AutosaveMachine>>,
    timer_id: Arc<Mutex<Option<i32>>>,

    pub saving: RwSignal<bool>,
    pub last_saved_ms: RwSignal<Option<i64>>,
    pub last_error: RwSignal<Option<String>>,
}

impl AutosaveController {
    pub fn new(app_state: AppContext) -> Self {
        let debounce_ms = app_state.0.config.with_value(|c| c.autosave_debounce_ms);
        Self {
            app_state,
            machine: Arc::new(Mutex::new(AutosaveMachine::new(debounce_ms))),
            timer_id: Arc::new(Mutex::new(None)),
            saving: RwSignal::new(false),
            last_saved_ms: RwSignal::new(None),
            last_error: RwSignal::new(None),
        }
    }

    fn machine(&self) -> MutexGuard<'_, AutosaveMachine> {
        self.machine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start tracking a freshly loaded document. The caller follows up with
    /// the initial snapshot via [`Self::record_edit`]; that one is not saved.
    pub fn load(&self, document_id: &str) {
        self.clear_timer();
        self.machine().load(document_id);
        self.sync_signals();
    }

    pub fn record_edit(&self, snapshot: Snapshot) {
        let effect = self.machine().record_edit(snapshot);
        self.run(effect);
    }

    pub fn save_now(&self) {
        let effect = self.machine().save_now();
        if effect.is_some() {
            self.clear_timer();
        }
        self.run(effect);
    }

    /// Forget the current document; pending work is dropped.
    pub fn reset(&self) {
        self.clear_timer();
        self.machine().reset();
        self.sync_signals();
    }

    fn run(&self, effect: Option<AutosaveEffect>) {
        match effect {
            None => {}
            Some(AutosaveEffect::ArmTimer {
                generation,
                delay_ms,
            }) => self.arm_timer(generation, delay_ms),
            Some(AutosaveEffect::Persist(req)) => self.persist(req),
            Some(AutosaveEffect::RefreshListing) => self.app_state.0.refresh_documents(),
        }
        self.sync_signals();
    }

    fn sync_signals(&self) {
        let (saving, last_saved, last_error) = {
            let m = self.machine();
            (
                m.is_saving(),
                m.last_saved_ms(),
                m.last_error().map(str::to_string),
            )
        };
        self.saving.set(saving);
        self.last_saved_ms.set(last_saved);
        self.last_error.set(last_error);
    }

    fn clear_timer(&self) {
        let previous = self
            .timer_id
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let (Some(tid), Some(win)) = (previous, web_sys::window()) {
            win.clear_timeout_with_handle(tid);
        }
    }

    fn arm_timer(&self, generation: u64, delay_ms: u32) {
        self.clear_timer();
        let Some(win) = web_sys::window() else {
            return;
        };

        let s2 = self.clone();
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            if let Ok(mut slot) = s2.timer_id.lock() {
                *slot = None;
            }
            let effect = s2.machine().timer_elapsed(generation);
            s2.run(effect);
        });

        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                i32::try_from(delay_ms).unwrap_or(i32::MAX),
            )
            .ok();

        if let Ok(mut slot) = self.timer_id.lock() {
            *slot = tid;
        }
    }

    fn persist(&self, req: SaveRequest) {
        let s2 = self.clone();
        let api_client = self.app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let SaveRequest {
                seq,
                document_id,
                patch,
            } = req;
            debug!(%document_id, seq, "autosave: request sent");

            match api_client.update(&document_id, patch).await {
                Ok(_) => {
                    let effect = s2.machine().save_succeeded(seq, now_ms());
                    s2.run(effect);
                }
                Err(e) => {
                    s2.app_state.0.handle_error(&e);
                    s2.machine().save_failed(seq, &e.to_string());
                    s2.sync_signals();
                }
            }
        });
    }
}
