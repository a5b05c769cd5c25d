mod autosave;

pub(crate) use autosave::AutosaveController;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::documents::DocumentTreeService;
use crate::error::{AppError, ErrorDisposition};
use crate::models::{Document, UserSummary};
use crate::storage::{load_json_from_storage, save_json_to_storage, EXPANDED_KEY, USER_KEY};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub config: StoredValue<AppConfig>,
    pub api_client: RwSignal<ApiClient>,
    pub current_user: RwSignal<Option<UserSummary>>,

    /// Flat listing backing the sidebar tree.
    pub documents: RwSignal<Vec<Document>>,
    pub documents_loading: RwSignal<bool>,
    pub documents_error: RwSignal<Option<String>>,

    /// Guards against stale listing responses.
    pub documents_request_id: RwSignal<u64>,

    /// Sidebar nodes the user has opened, persisted across reloads.
    pub expanded: RwSignal<HashSet<String>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let api_client = ApiClient::from_config(&config);
        let current_user = load_json_from_storage::<UserSummary>(USER_KEY);
        let expanded = load_json_from_storage::<Vec<String>>(EXPANDED_KEY)
            .unwrap_or_default()
            .into_iter()
            .collect();

        Self {
            config: StoredValue::new(config),
            api_client: RwSignal::new(api_client),
            current_user: RwSignal::new(current_user),
            documents: RwSignal::new(vec![]),
            documents_loading: RwSignal::new(false),
            documents_error: RwSignal::new(None),
            documents_request_id: RwSignal::new(0),
            expanded: RwSignal::new(expanded),
        }
    }

    pub fn config(&self) -> AppConfig {
        self.config.get_value()
    }

    pub fn set_user(&self, user: UserSummary) {
        save_json_to_storage(USER_KEY, &user);
        self.current_user.set(Some(user));
    }

    /// Reload the sidebar listing. Only the newest request's answer is applied.
    pub fn refresh_documents(&self) {
        let req_id = self.documents_request_id.get_untracked().saturating_add(1);
        self.documents_request_id.set(req_id);
        self.documents_loading.set(true);
        self.documents_error.set(None);

        let state = self.clone();
        let api_client = self.api_client.get_untracked();
        spawn_local(async move {
            let result = api_client.list().await;

            if state.documents_request_id.get_untracked() != req_id {
                debug!(req_id, "ignoring stale document listing");
                return;
            }

            match result {
                Ok(docs) => state.documents.set(docs),
                Err(e) => {
                    state.handle_error(&e);
                    state.documents_error.set(Some(e.to_string()));
                }
            }
            state.documents_loading.set(false);
        });
    }

    pub fn set_expanded(&self, id: &str, open: bool) {
        self.expanded.update(|set| {
            if open {
                set.insert(id.to_string());
            } else {
                set.remove(id);
            }
        });
        self.persist_expanded();
    }

    /// Open every node on `path` so the current document is visible.
    pub fn expand_path(&self, path: &[String]) {
        let missing: Vec<&String> = self
            .expanded
            .with_untracked(|set| path.iter().filter(|id| !set.contains(*id)).collect());
        if missing.is_empty() {
            return;
        }
        self.expanded.update(|set| {
            set.extend(missing.into_iter().cloned());
        });
        self.persist_expanded();
    }

    fn persist_expanded(&self) {
        let ids: Vec<String> = self.expanded.with_untracked(|set| set.iter().cloned().collect());
        save_json_to_storage(EXPANDED_KEY, &ids);
    }

    /// Drop the session and leave for the sign-in page.
    pub fn sign_out(&self) {
        let mut client = self.api_client.get_untracked();
        client.logout();
        self.api_client.set(client);
        self.current_user.set(None);
        let signin_url = self.config.with_value(|c| c.signin_url.clone());
        let _ = window().location().set_href(&signin_url);
    }

    /// Apply the app-wide reaction to `err` and tell the caller what is left for it to do.
    ///
    /// An expired session is handled here: the stored token is dropped and the
    /// browser is sent to the sign-in page.
    pub fn handle_error(&self, err: &AppError) -> ErrorDisposition {
        let disposition = err.disposition();
        match &disposition {
            ErrorDisposition::RedirectToSignIn => self.sign_out(),
            ErrorDisposition::LogOnly => {
                warn!(error = %err, transient = err.is_transient(), "request failed")
            }
            ErrorDisposition::RedirectToListing | ErrorDisposition::Inline(_) => {}
        }
        disposition
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
