use crate::components::ui::{Button, ButtonSize, ButtonVariant, Card, CardContent, CardHeader, CardTitle};
use crate::editor::child_link_label;
use crate::models::DocumentRef;
use leptos::prelude::*;

/// Sub-pages of the open document, each with an "insert link" action.
#[component]
pub fn ChildDocuments(
    #[prop(into)] children: Signal<Vec<DocumentRef>>,
    #[prop(into)] on_open: Callback<String>,
    #[prop(into)] on_insert_link: Callback<DocumentRef>,
    #[prop(into)] on_create_child: Callback<()>,
) -> impl IntoView {
    view! {
        <Card class="gap-2 py-3">
            <CardHeader class="flex-row items-center justify-between px-4">
                <CardTitle class="text-sm">"Sub-pages"</CardTitle>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Xs
                    on:click=move |_| on_create_child.run(())
                >
                    "+ New sub-page"
                </Button>
            </CardHeader>
            <CardContent class="px-4">
                <Show
                    when=move || !children.with(Vec::is_empty)
                    fallback=|| view! { <p class="text-xs text-muted-foreground">"No sub-pages yet."</p> }
                >
                    <ul class="grid gap-1 sm:grid-cols-2">
                        <For
                            each=move || children.get()
                            key=|c| (c.id.clone(), c.title.clone(), c.icon.clone())
                            let:child
                        >
                            {
                                let label = child_link_label(&child);
                                let id = child.id.clone();
                                view! {
                                    <li class="flex items-center gap-2 rounded-md border px-2 py-1 text-sm">
                                        <button
                                            type="button"
                                            class="min-w-0 flex-1 truncate text-left hover:underline"
                                            on:click=move |_| on_open.run(id.clone())
                                        >
                                            {label}
                                        </button>
                                        <Button
                                            variant=ButtonVariant::Ghost
                                            size=ButtonSize::Xs
                                            attr:title="Insert a link at the caret"
                                            on:click=move |_| on_insert_link.run(child.clone())
                                        >
                                            "Insert link"
                                        </Button>
                                    </li>
                                }
                            }
                        </For>
                    </ul>
                </Show>
            </CardContent>
        </Card>
    }
}
