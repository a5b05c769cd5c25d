use crate::autosave::Snapshot;
use crate::components::ui::{
    Alert, AlertDescription, Badge, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardHeader, CardTitle, ErrorNotice, Input, Spinner,
};
use crate::components::{ChildDocuments, ContentView, DocumentSidebar, MediaPanel, TableOfContents};
use crate::content::ContentNode;
use crate::documents::DocumentTreeService;
use crate::editor::{EditorHandle, DEFAULT_DOCUMENT_ICON};
use crate::error::ErrorDisposition;
use crate::models::{Document, DocumentRef, NewDocument, UserSummary};
use crate::state::{AppContext, AppState, AutosaveController};
use crate::toc::extract_toc;
use crate::util::format_clock;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_navigate, use_params, use_query_map};
use leptos_router::params::Params;
use tracing::{info, warn};

/// Create an untitled page under `parent_id` and hand its id to `open`.
fn create_document(state: AppState, parent_id: Option<String>, open: impl Fn(String) + 'static) {
    let api_client = state.api_client.get_untracked();
    spawn_local(async move {
        match api_client.create(NewDocument::untitled(parent_id.clone())).await {
            Ok(doc) => {
                info!(id = %doc.id, parent = ?parent_id, "document created");
                if let Some(parent) = &parent_id {
                    state.set_expanded(parent, true);
                }
                state.refresh_documents();
                open(doc.id);
            }
            Err(e) => {
                if let ErrorDisposition::Inline(message) = state.handle_error(&e) {
                    state.documents_error.set(Some(message));
                } else {
                    state.documents_error.set(Some(e.to_string()));
                }
            }
        }
    });
}

#[component]
pub fn AppLayout(
    #[prop(into)] current_id: Signal<Option<String>>,
    children: Children,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let on_create = Callback::new(move |parent: Option<String>| {
        create_document(app_state.0.clone(), parent, move |id| {
            navigate.with_value(|nav| nav(&format!("/documents/{id}"), Default::default()));
        });
    });

    view! {
        <div class="flex h-screen bg-background text-foreground">
            <DocumentSidebar current_id=current_id on_create=on_create />
            <main class="min-w-0 flex-1 overflow-y-auto">
                {children()}
            </main>
        </div>
    }
}

#[component]
pub fn RootAuthed(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let api_client = app_state.0.api_client;
    let is_authenticated = move || api_client.with(|c| c.is_authenticated());

    let state = app_state.clone();
    Effect::new(move |_| {
        if is_authenticated() {
            state.0.refresh_documents();
        } else {
            let signin_url = state.0.config.with_value(|c| c.signin_url.clone());
            let _ = window().location().set_href(&signin_url);
        }
    });

    // Store children so the view macro sees an `Fn` (not an `FnOnce`).
    let children = StoredValue::new(children);

    view! {
        <Show
            when=is_authenticated
            fallback=|| view! {
                <div class="flex h-screen items-center justify-center">
                    <Spinner class="text-muted-foreground" />
                </div>
            }
        >
            {move || children.with_value(|c| c())}
        </Show>
    }
}

#[component]
pub fn RootPage() -> impl IntoView {
    let navigate = use_navigate();
    Effect::new(move |_| navigate("/documents", Default::default()));
}

#[component]
pub fn DocumentsPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());
    let documents = app_state.0.documents;
    let documents_loading = app_state.0.documents_loading;

    let roots = Memo::new(move |_| {
        documents.with(|docs| {
            let mut roots: Vec<Document> = docs
                .iter()
                .filter(|d| d.parent_id.is_none())
                .cloned()
                .collect();
            roots.sort_by_key(|d| d.position);
            roots
        })
    });

    let create_root = move |_: web_sys::MouseEvent| {
        create_document(app_state.0.clone(), None, move |id| {
            navigate.with_value(|nav| nav(&format!("/documents/{id}"), Default::default()));
        });
    };

    view! {
        <AppLayout current_id=Signal::stored(None::<String>)>
            <div class="mx-auto flex max-w-3xl flex-col gap-4 px-6 py-8">
                <div class="flex items-center justify-between">
                    <h1 class="text-xl font-semibold">"Documents"</h1>
                    <Button size=ButtonSize::Sm on:click=create_root>"+ New page"</Button>
                </div>

                <Show
                    when=move || !roots.with(Vec::is_empty)
                    fallback=move || view! {
                        <p class="text-sm text-muted-foreground">
                            {move || if documents_loading.get() {
                                "Loading…"
                            } else {
                                "No documents yet. Create the first page to get started."
                            }}
                        </p>
                    }
                >
                    <div class="grid gap-3 sm:grid-cols-2">
                        <For each=move || roots.get() key=|d| (d.id.clone(), d.title.clone(), d.icon.clone()) let:doc>
                            {
                                let href = format!("/documents/{}", doc.id);
                                let icon = doc
                                    .icon
                                    .clone()
                                    .filter(|i| !i.trim().is_empty())
                                    .unwrap_or_else(|| DEFAULT_DOCUMENT_ICON.to_string());
                                let title = doc.display_title().to_string();
                                let sub_pages = doc.children.len();
                                view! {
                                    <a href=href class="block">
                                        <Card class="gap-1 py-4 hover:bg-accent/40">
                                            <CardHeader class="px-4">
                                                <CardTitle class="text-sm">
                                                    <span class="mr-2">{icon}</span>
                                                    {title}
                                                </CardTitle>
                                            </CardHeader>
                                            <CardContent class="px-4 text-xs text-muted-foreground">
                                                {format!("{sub_pages} sub-pages")}
                                            </CardContent>
                                        </Card>
                                    </a>
                                }
                            }
                        </For>
                    </div>
                </Show>
            </div>
        </AppLayout>
    }
}

#[derive(Params, PartialEq, Clone, Debug)]
pub struct DocumentRouteParams {
    pub id: Option<String>,
}

#[component]
pub fn DocumentPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<DocumentRouteParams>();
    let navigate = StoredValue::new(use_navigate());

    let document_id = Memo::new(move |_| {
        params
            .get()
            .ok()
            .and_then(|p| p.id)
            .filter(|id| !id.trim().is_empty())
    });

    let document: RwSignal<Option<Document>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(true);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let load_request_id: RwSignal<u64> = RwSignal::new(0);

    let title: RwSignal<String> = RwSignal::new(String::new());
    let icon: RwSignal<String> = RwSignal::new(String::new());
    let editor: RwSignal<EditorHandle> = RwSignal::new(EditorHandle::new(ContentNode::empty_doc()));
    let show_toc: RwSignal<bool> = RwSignal::new(false);
    let show_media: RwSignal<bool> = RwSignal::new(false);
    let deleting: RwSignal<bool> = RwSignal::new(false);

    let autosave = AutosaveController::new(app_state.clone());
    let saving = autosave.saving;
    let last_saved_ms = autosave.last_saved_ms;
    let save_error = autosave.last_error;
    let autosave = StoredValue::new(autosave);

    let snapshot = move || Snapshot {
        title: title.get_untracked(),
        icon: Some(icon.get_untracked()).filter(|i| !i.trim().is_empty()),
        content: editor.with_untracked(|ed| ed.doc().clone()),
    };

    let go_to = move |path: String| {
        navigate.with_value(|nav| nav(&path, Default::default()));
    };

    // (Re)load whenever the route id changes. Only the newest response is applied.
    let state_for_load = app_state.clone();
    Effect::new(move |_| {
        let id = document_id.get();
        autosave.with_value(|a| a.reset());
        show_media.set(false);
        document.set(None);

        let Some(id) = id else {
            go_to("/documents".to_string());
            return;
        };

        let req_id = load_request_id.get_untracked().saturating_add(1);
        load_request_id.set(req_id);
        loading.set(true);
        error.set(None);

        let state = state_for_load.clone();
        let api_client = state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = api_client.get(&id).await;
            if load_request_id.get_untracked() != req_id {
                return;
            }
            match result {
                Ok(doc) => {
                    title.set(doc.title.clone());
                    icon.set(doc.icon.clone().unwrap_or_default());
                    editor.set(EditorHandle::new(doc.body()));
                    autosave.with_value(|a| {
                        a.load(&doc.id);
                        a.record_edit(snapshot());
                    });
                    document.set(Some(doc));
                }
                Err(e) => match state.0.handle_error(&e) {
                    ErrorDisposition::RedirectToListing => {
                        warn!(%id, "document is gone; back to the listing");
                        state.0.refresh_documents();
                        go_to("/documents".to_string());
                    }
                    ErrorDisposition::Inline(message) => error.set(Some(message)),
                    ErrorDisposition::LogOnly | ErrorDisposition::RedirectToSignIn => {
                        error.set(Some(e.to_string()))
                    }
                },
            }
            loading.set(false);
        });
    });

    let autosave_on_cleanup = autosave.get_value();
    on_cleanup(move || autosave_on_cleanup.reset());

    // Title and icon edits flow through the same debounce as body edits.
    Effect::new(move |_| {
        title.track();
        icon.track();
        if document.with_untracked(Option::is_none) {
            return;
        }
        autosave.with_value(|a| a.record_edit(snapshot()));
    });

    let on_change = Callback::new(move |()| {
        autosave.with_value(|a| a.record_edit(snapshot()));
    });

    let on_navigate = Callback::new(move |id: String| go_to(format!("/documents/{id}")));

    let on_insert_link = Callback::new(move |child: DocumentRef| {
        match editor.try_update(|ed| ed.insert_child_link(&child)) {
            Some(Ok(())) => on_change.run(()),
            Some(Err(e)) => warn!(child = %child.id, error = %e, "child link insertion rejected"),
            None => {}
        }
    });

    let on_pick_image = Callback::new(move |(src, alt): (String, Option<String>)| {
        match editor.try_update(|ed| ed.insert_image(&src, alt.as_deref())) {
            Some(Ok(())) => {
                show_media.set(false);
                on_change.run(());
            }
            Some(Err(e)) => warn!(%src, error = %e, "image insertion rejected"),
            None => {}
        }
    });

    let state_for_child = app_state.clone();
    let on_create_child = Callback::new(move |()| {
        let parent = document_id.get_untracked();
        create_document(state_for_child.0.clone(), parent, move |id| {
            go_to(format!("/documents/{id}"));
        });
    });

    let state_for_delete = app_state.clone();
    let on_delete = move |_: web_sys::MouseEvent| {
        let Some(id) = document_id.get_untracked() else {
            return;
        };
        let confirmed = window()
            .confirm_with_message("Delete this page and all of its sub-pages?")
            .unwrap_or(false);
        if !confirmed {
            return;
        }

        autosave.with_value(|a| a.reset());
        deleting.set(true);
        let state = state_for_delete.clone();
        let api_client = state.0.api_client.get_untracked();
        spawn_local(async move {
            match api_client.delete(&id).await {
                Ok(()) => {
                    info!(%id, "document deleted");
                    state.0.refresh_documents();
                    go_to("/documents".to_string());
                }
                Err(e) => {
                    state.0.handle_error(&e);
                    error.set(Some(e.to_string()));
                }
            }
            deleting.set(false);
        });
    };

    let toc = Memo::new(move |_| editor.with(|ed| extract_toc(ed.doc())));
    let children = Signal::derive(move || {
        document.with(|d| d.as_ref().map(|d| d.children.clone()).unwrap_or_default())
    });

    let owner_label = move || {
        document.with(|d| {
            d.as_ref()
                .and_then(|d| d.owner.as_ref())
                .and_then(|o| o.name.clone().or_else(|| o.email.clone()))
        })
    };
    let shared_count = move || document.with(|d| d.as_ref().map_or(0, |d| d.permissions.len()));

    let save_status = move || {
        if saving.get() {
            "Saving…".to_string()
        } else if save_error.with(Option::is_some) {
            "Save failed".to_string()
        } else if let Some(ms) = last_saved_ms.get() {
            format!("Saved {}", format_clock(ms))
        } else {
            String::new()
        }
    };

    view! {
        <AppLayout current_id=document_id>
            <div class="mx-auto flex max-w-4xl flex-col gap-4 px-6 py-6">
                <ErrorNotice message=error />

                <Show
                    when=move || document.with(Option::is_some)
                    fallback=move || view! {
                        <Show when=move || loading.get() fallback=|| ()>
                            <div class="flex justify-center py-16">
                                <Spinner class="text-muted-foreground" />
                            </div>
                        </Show>
                    }
                >
                    <header class="flex flex-col gap-2">
                        <div class="flex items-center gap-2">
                            <Input bind_value=icon placeholder=DEFAULT_DOCUMENT_ICON class="h-10 w-14 text-center text-xl" />
                            <Input bind_value=title placeholder="Untitled" class="h-10 text-2xl font-semibold" />
                        </div>
                        <div class="flex flex-wrap items-center gap-2 text-xs">
                            {move || owner_label().map(|name| view! { <Badge>{format!("Owner: {name}")}</Badge> })}
                            {move || {
                                let n = shared_count();
                                (n > 0).then(|| view! { <Badge>{format!("Shared with {n}")}</Badge> })
                            }}
                            <span class="text-muted-foreground">{save_status}</span>
                            <div class="ml-auto flex items-center gap-1">
                                <Button
                                    variant=ButtonVariant::Outline
                                    size=ButtonSize::Xs
                                    attr:disabled=move || saving.get()
                                    on:click=move |_| autosave.with_value(|a| a.save_now())
                                >
                                    "Save"
                                </Button>
                                <Button
                                    variant=ButtonVariant::Ghost
                                    size=ButtonSize::Xs
                                    on:click=move |_| show_toc.update(|v| *v = !*v)
                                >
                                    {move || if show_toc.get() { "Hide contents" } else { "Contents" }}
                                </Button>
                                <Button
                                    variant=ButtonVariant::Ghost
                                    size=ButtonSize::Xs
                                    on:click=move |_| show_media.update(|v| *v = !*v)
                                >
                                    "Image"
                                </Button>
                                <Button
                                    variant=ButtonVariant::Destructive
                                    size=ButtonSize::Xs
                                    attr:disabled=move || deleting.get()
                                    on:click=on_delete.clone()
                                >
                                    "Delete"
                                </Button>
                            </div>
                        </div>
                    </header>

                    <Show when=move || show_media.get() fallback=|| ()>
                        <MediaPanel on_pick=on_pick_image on_close=move |()| show_media.set(false) />
                    </Show>

                    <div class="flex gap-6">
                        <div class="min-w-0 flex-1">
                            <ContentView editor=editor on_change=on_change on_navigate=on_navigate />
                        </div>
                        <Show when=move || show_toc.get() fallback=|| ()>
                            <aside class="sticky top-4 w-60 shrink-0 self-start">
                                <TableOfContents entries=toc />
                            </aside>
                        </Show>
                    </div>

                    <ChildDocuments
                        children=children
                        on_open=on_navigate
                        on_insert_link=on_insert_link
                        on_create_child=on_create_child
                    />
                </Show>
            </div>
        </AppLayout>
    }
}

/// Session hand-off. The identity provider returns here with `?token=`.
#[component]
pub fn SignInPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let query = use_query_map();
    let navigate = StoredValue::new(use_navigate());
    let token_value: RwSignal<String> = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);

    let state = app_state.clone();
    let accept_token = move |token: String| {
        let token = token.trim().to_string();
        if token.is_empty() {
            error.set(Some("A session token is required.".to_string()));
            return;
        }
        state.0.api_client.update(|c| c.set_token(token));
        info!("session token accepted");
        navigate.with_value(|nav| nav("/documents", Default::default()));
    };

    let accept_from_query = accept_token.clone();
    Effect::new(move |_| {
        if let Some(token) = query.get().get("token").filter(|t| !t.trim().is_empty()) {
            accept_from_query(token);
        }
    });

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        accept_token(token_value.get_untracked());
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-sm flex-col justify-center px-4 py-10">
                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">"Sign in"</CardTitle>
                    </CardHeader>
                    <CardContent>
                        <form class="flex flex-col gap-3" on:submit=on_submit>
                            <p class="text-xs text-muted-foreground">
                                "Paste the session token issued by your identity provider."
                            </p>
                            <Input id="token" bind_value=token_value placeholder="Session token" class="h-8 text-sm" />
                            <ErrorNotice message=error />
                            <Button class="w-full" size=ButtonSize::Sm>"Continue"</Button>
                        </form>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn SettingsPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let current_user = app_state.0.current_user;

    let name: RwSignal<String> = RwSignal::new(
        current_user
            .get_untracked()
            .and_then(|u| u.name)
            .unwrap_or_default(),
    );
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let success: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let state = app_state.clone();
    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let name_val = name.get_untracked();
        let api_client = state.0.api_client.get_untracked();
        let state = state.clone();

        loading.set(true);
        error.set(None);
        success.set(None);

        spawn_local(async move {
            match api_client.update_profile(&name_val).await {
                Ok(res) => {
                    let user = res.user.or_else(|| {
                        state.0.current_user.get_untracked().map(|u| UserSummary {
                            name: Some(name_val.trim().to_string()),
                            ..u
                        })
                    });
                    if let Some(user) = user {
                        state.0.set_user(user);
                    }
                    success.set(Some(res.message.unwrap_or_else(|| "Profile updated".to_string())));
                }
                Err(e) => match state.0.handle_error(&e) {
                    ErrorDisposition::Inline(message) => error.set(Some(message)),
                    _ => error.set(Some(e.to_string())),
                },
            }
            loading.set(false);
        });
    };

    view! {
        <AppLayout current_id=Signal::stored(None::<String>)>
            <div class="mx-auto flex max-w-md flex-col gap-4 px-6 py-8">
                <h1 class="text-xl font-semibold">"Settings"</h1>
                <Card>
                    <CardHeader>
                        <CardTitle class="text-sm">"Profile"</CardTitle>
                    </CardHeader>
                    <CardContent>
                        <form class="flex flex-col gap-3" on:submit=on_submit>
                            <label class="flex flex-col gap-1.5 text-xs">
                                "Display name"
                                <Input id="display-name" bind_value=name class="h-8 text-sm" />
                            </label>
                            <ErrorNotice message=error />
                            {move || success.get().map(|m| view! {
                                <Alert>
                                    <AlertDescription class="text-xs">{m}</AlertDescription>
                                </Alert>
                            })}
                            <Button size=ButtonSize::Sm attr:disabled=move || loading.get()>
                                {move || if loading.get() { "Saving..." } else { "Save" }}
                            </Button>
                        </form>
                    </CardContent>
                </Card>
            </div>
        </AppLayout>
    }
}
