use crate::toc::TocEntry;
use leptos::prelude::*;
use web_sys::{ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition};

fn scroll_to_heading(id: &str) {
    let Some(el) = document().get_element_by_id(id) else {
        return;
    };
    let opts = ScrollIntoViewOptions::new();
    opts.set_behavior(ScrollBehavior::Smooth);
    opts.set_block(ScrollLogicalPosition::Start);
    el.scroll_into_view_with_scroll_into_view_options(&opts);
}

#[component]
pub fn TableOfContents(#[prop(into)] entries: Signal<Vec<TocEntry>>) -> impl IntoView {
    view! {
        <nav class="rounded-md border bg-muted/30 p-3 text-sm">
            <div class="mb-2 font-semibold">"📑 Contents"</div>
            <Show
                when=move || !entries.with(Vec::is_empty)
                fallback=|| view! {
                    <p class="text-xs text-muted-foreground">
                        "Add headings to the document to build a table of contents."
                    </p>
                }
            >
                <ul class="flex flex-col gap-0.5">
                    <For
                        each=move || entries.get()
                        key=|e| (e.id.clone(), e.text.clone(), e.level)
                        let:entry
                    >
                        {
                            let id = entry.id.clone();
                            let style = format!("padding-left: {}rem", entry.indent() as f32 * 0.75);
                            let class = if entry.level == 1 {
                                "w-full truncate rounded px-1 py-0.5 text-left font-semibold hover:bg-accent"
                            } else {
                                "w-full truncate rounded px-1 py-0.5 text-left text-muted-foreground hover:bg-accent"
                            };
                            view! {
                                <li style=style>
                                    <button type="button" class=class on:click=move |_| scroll_to_heading(&id)>
                                        {entry.text.clone()}
                                    </button>
                                </li>
                            }
                        }
                    </For>
                </ul>
            </Show>
        </nav>
    }
}
