use crate::config::AppConfig;
use crate::pages::{DocumentPage, DocumentsPage, RootAuthed, RootPage, SettingsPage, SignInPage};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    provide_context(AppContext(AppState::new(AppConfig::from_window())));

    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("auth/signin") view=SignInPage />
                <Route path=path!("documents") view=move || view! {
                    <RootAuthed>
                        <DocumentsPage />
                    </RootAuthed>
                } />
                <Route path=path!("documents/:id") view=move || view! {
                    <RootAuthed>
                        <DocumentPage />
                    </RootAuthed>
                } />
                <Route path=path!("settings") view=move || view! {
                    <RootAuthed>
                        <SettingsPage />
                    </RootAuthed>
                } />
                <Route path=path!("") view=RootPage />
            </Routes>
        </Router>
    }
}
