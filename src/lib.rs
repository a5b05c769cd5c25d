mod api;
mod app;
pub mod autosave;
mod components;
pub mod config;
pub mod content;
pub mod documents;
pub mod editor;
pub mod error;
mod logging;
pub mod media;
pub mod models;
mod pages;
mod state;
mod storage;
pub mod toc;
mod util;

use crate::app::App;
use crate::config::AppConfig;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::api::ApiClient;
    use crate::config::AppConfig;
    use crate::models::UserSummary;
    use crate::storage::{
        clear_session, load_json_from_storage, load_token, save_json_to_storage, EXPANDED_KEY,
        USER_KEY,
    };
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_session_token_roundtrip() {
        clear_session();
        let mut client = ApiClient::from_config(&AppConfig::default());
        assert!(!client.is_authenticated());

        client.set_token("t1".to_string());
        assert_eq!(load_token().as_deref(), Some("t1"));
        assert!(ApiClient::from_config(&AppConfig::default()).is_authenticated());

        client.logout();
        assert!(load_token().is_none());
        assert!(!ApiClient::from_config(&AppConfig::default()).is_authenticated());
    }

    #[wasm_bindgen_test]
    fn test_logout_forgets_cached_user() {
        let user = UserSummary {
            id: "u1".into(),
            name: Some("Ada".into()),
            email: None,
            image: None,
        };
        save_json_to_storage(USER_KEY, &user);
        assert_eq!(load_json_from_storage::<UserSummary>(USER_KEY), Some(user));

        clear_session();
        assert!(load_json_from_storage::<UserSummary>(USER_KEY).is_none());
    }

    #[wasm_bindgen_test]
    fn test_expanded_nodes_roundtrip() {
        save_json_to_storage(EXPANDED_KEY, &vec!["a".to_string(), "b".to_string()]);
        let loaded: Vec<String> = load_json_from_storage(EXPANDED_KEY).unwrap_or_default();
        assert_eq!(loaded, vec!["a".to_string(), "b".to_string()]);
    }

    #[wasm_bindgen_test]
    fn test_empty_api_url_resolves_to_page_origin() {
        let client = ApiClient::from_config(&AppConfig::default());
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_default();
        assert_eq!(client.url("/api/media"), format!("{origin}/api/media"));
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    logging::init(&AppConfig::from_window());
    mount_to_body(App);
}
