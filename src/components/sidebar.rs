use crate::components::ui::{Button, ButtonSize, ButtonVariant, ErrorNotice, Spinner};
use crate::documents::{build_tree, find_path, TreeNode};
use crate::editor::DEFAULT_DOCUMENT_ICON;
use crate::state::AppContext;
use icons::{ChevronDown, ChevronRight};
use leptos::prelude::*;
use leptos_router::hooks::use_navigate;
use std::collections::HashSet;

#[derive(Clone, Copy)]
struct TreeActions {
    current_id: Signal<Option<String>>,
    expanded: RwSignal<HashSet<String>>,
    on_select: Callback<String>,
    on_toggle: Callback<(String, bool)>,
    on_create: Callback<Option<String>>,
}

fn tree_item(node: TreeNode, depth: usize, actions: TreeActions) -> AnyView {
    let id = node.document.id.clone();
    let has_children = !node.children.is_empty();
    let label = node.document.display_title().to_string();
    let icon = node
        .document
        .icon
        .clone()
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DOCUMENT_ICON.to_string());
    let children = StoredValue::new(node.children);

    let id_open = id.clone();
    let is_open = move || actions.expanded.with(|set| set.contains(&id_open));
    let id_current = id.clone();
    let is_current = move || {
        actions
            .current_id
            .with(|c| c.as_deref() == Some(id_current.as_str()))
    };

    let id_toggle = id.clone();
    let toggle = move |ev: web_sys::MouseEvent| {
        ev.stop_propagation();
        let open = actions.expanded.with_untracked(|set| set.contains(&id_toggle));
        actions.on_toggle.run((id_toggle.clone(), !open));
    };
    let id_select = id.clone();
    let select = move |_| actions.on_select.run(id_select.clone());
    let id_create = id.clone();
    let create_child = move |ev: web_sys::MouseEvent| {
        ev.stop_propagation();
        actions.on_create.run(Some(id_create.clone()));
    };

    let indent = format!("padding-left: {}rem", depth as f32 * 0.75 + 0.25);
    let is_open_chevron = is_open.clone();

    view! {
        <li>
            <div
                class=move || {
                    if is_current() {
                        "group flex items-center gap-1 rounded-md bg-accent py-1 pr-1 text-sm font-medium"
                    } else {
                        "group flex items-center gap-1 rounded-md py-1 pr-1 text-sm hover:bg-accent/60"
                    }
                }
                style=indent
                on:click=select
            >
                {if has_children {
                    view! {
                        <button type="button" class="size-5 shrink-0" on:click=toggle>
                            {move || if is_open_chevron() {
                                view! { <ChevronDown class="size-4" /> }.into_any()
                            } else {
                                view! { <ChevronRight class="size-4" /> }.into_any()
                            }}
                        </button>
                    }
                    .into_any()
                } else {
                    view! { <span class="size-5 shrink-0"></span> }.into_any()
                }}
                <span class="shrink-0">{icon}</span>
                <span class="min-w-0 flex-1 truncate">{label}</span>
                <button
                    type="button"
                    class="invisible size-5 shrink-0 rounded text-muted-foreground hover:bg-background group-hover:visible"
                    title="Add a page inside"
                    on:click=create_child
                >
                    "+"
                </button>
            </div>
            {move || {
                is_open().then(|| {
                    let nodes = children.get_value();
                    view! {
                        <ul>
                            {nodes
                                .into_iter()
                                .map(|child| tree_item(child, depth + 1, actions))
                                .collect_view()}
                        </ul>
                    }
                })
            }}
        </li>
    }
    .into_any()
}

/// Document hierarchy navigator.
///
/// The current document's ancestors are opened automatically.
#[component]
pub fn DocumentSidebar(
    #[prop(into)] current_id: Signal<Option<String>>,
    #[prop(into)] on_create: Callback<Option<String>>,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let documents = app_state.0.documents;
    let tree = Memo::new(move |_| documents.with(|docs| build_tree(docs)));

    let state_for_expand = app_state.clone();
    Effect::new(move |_| {
        let Some(id) = current_id.get() else {
            return;
        };
        let path = tree.with(|t| find_path(t, &id));
        if let Some(mut path) = path {
            path.pop();
            state_for_expand.0.expand_path(&path);
        }
    });

    let state_for_toggle = app_state.clone();
    let actions = TreeActions {
        current_id,
        expanded: app_state.0.expanded,
        on_select: Callback::new(move |id: String| {
            navigate.with_value(|nav| nav(&format!("/documents/{id}"), Default::default()));
        }),
        on_toggle: Callback::new(move |(id, open): (String, bool)| {
            state_for_toggle.0.set_expanded(&id, open);
        }),
        on_create,
    };

    let current_user = app_state.0.current_user;
    let user_name = move || {
        current_user
            .get()
            .and_then(|u| u.name.or(u.email))
            .unwrap_or_else(|| "Signed in".to_string())
    };

    let state_for_signout = app_state.clone();
    let sign_out = move |_| state_for_signout.0.sign_out();

    let loading = app_state.0.documents_loading;
    let error = app_state.0.documents_error;

    view! {
        <aside class="flex h-full w-72 shrink-0 flex-col border-r bg-muted/20">
            <div class="flex items-center justify-between px-3 py-3">
                <a href="/documents" class="text-sm font-semibold">"PageTree"</a>
                <Show when=move || loading.get() fallback=|| ()>
                    <Spinner class="size-3 text-muted-foreground" />
                </Show>
            </div>

            <div class="px-3 pb-2">
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    class="w-full"
                    on:click=move |_| on_create.run(None)
                >
                    "+ New page"
                </Button>
            </div>

            <div class="px-3">
                <ErrorNotice message=error />
            </div>

            <ul class="min-h-0 flex-1 overflow-y-auto px-2">
                {move || {
                    tree.get()
                        .into_iter()
                        .map(|node| tree_item(node, 0, actions))
                        .collect_view()
                }}
            </ul>

            <div class="flex items-center gap-2 border-t px-3 py-2 text-xs">
                <span class="min-w-0 flex-1 truncate">{user_name}</span>
                <a href="/settings" class="text-muted-foreground hover:underline">"Settings"</a>
                <Button variant=ButtonVariant::Ghost size=ButtonSize::Xs on:click=sign_out>
                    "Sign out"
                </Button>
            </div>
        </aside>
    }
}
