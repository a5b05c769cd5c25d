use crate::components::ui::{Button, ButtonSize, ButtonVariant, Input};
use crate::content::{ContentNode, Mark, MarkKind, NodeKind};
use crate::editor::{child_link_target, EditorHandle, MoveOutcome, Selection};
use crate::error::ContentError;
use crate::toc::heading_anchor_id;
use icons::{ChevronDown, ChevronUp};
use leptos::prelude::*;
use serde_json::{Map, Value};
use tracing::warn;
use wasm_bindgen::JsCast;

type EditOp = fn(&mut EditorHandle) -> Result<bool, ContentError>;

fn heading(level: i64) -> Map<String, Value> {
    let mut attrs = Map::new();
    attrs.insert("level".to_string(), Value::from(level));
    attrs
}

/// Toolbar formatting commands: button label, tooltip, operation.
fn format_ops() -> [(&'static str, &'static str, EditOp); 15] {
    [
        ("B", "Bold", |ed| ed.toggle_mark(MarkKind::Bold)),
        ("I", "Italic", |ed| ed.toggle_mark(MarkKind::Italic)),
        ("U", "Underline", |ed| ed.toggle_mark(MarkKind::Underline)),
        ("S", "Strikethrough", |ed| ed.toggle_mark(MarkKind::Strike)),
        ("</>", "Inline code", |ed| ed.toggle_mark(MarkKind::Code)),
        ("¶", "Paragraph", |ed| ed.set_block_type(NodeKind::Paragraph, Map::new())),
        ("H1", "Heading 1", |ed| ed.set_block_type(NodeKind::Heading, heading(1))),
        ("H2", "Heading 2", |ed| ed.set_block_type(NodeKind::Heading, heading(2))),
        ("H3", "Heading 3", |ed| ed.set_block_type(NodeKind::Heading, heading(3))),
        ("{ }", "Code block", |ed| ed.set_block_type(NodeKind::CodeBlock, Map::new())),
        ("•", "Bullet list", |ed| ed.wrap_in(NodeKind::BulletList)),
        ("1.", "Numbered list", |ed| ed.wrap_in(NodeKind::OrderedList)),
        ("☐", "Task list", |ed| ed.wrap_in(NodeKind::TaskList)),
        ("❝", "Quote", |ed| ed.wrap_in(NodeKind::Blockquote)),
        ("⌫", "Delete backward", EditorHandle::delete_backward),
    ]
}

/// Document body with block controls.
///
/// Clicking a block puts the caret at its end; shift-click extends the
/// selection to that block. `on_change` fires after every
/// edit that changed the document; clicks on child-document links are routed
/// to `on_navigate` instead of the browser.
#[component]
pub fn ContentView(
    editor: RwSignal<EditorHandle>,
    #[prop(into)] on_change: Callback<()>,
    #[prop(into)] on_navigate: Callback<String>,
) -> impl IntoView {
    let draft: RwSignal<String> = RwSignal::new(String::new());

    let edit = move |label: &'static str, op: EditOp| {
        let result = editor.try_update(op);
        match result {
            Some(Ok(true)) => on_change.run(()),
            Some(Ok(false)) | None => {}
            Some(Err(e)) => warn!(op = label, error = %e, "edit rejected"),
        }
    };

    let move_up = move |_| {
        edit("move up", |ed| Ok(matches!(ed.move_block_up(), MoveOutcome::Moved { .. })))
    };
    let move_down = move |_| {
        edit("move down", |ed| Ok(matches!(ed.move_block_down(), MoveOutcome::Moved { .. })))
    };
    let undo = move |_| edit("undo", EditorHandle::undo);
    let redo = move |_| edit("redo", EditorHandle::redo);

    let insert_draft = move || {
        let text = draft.get_untracked();
        if text.is_empty() {
            return;
        }
        let result = editor.try_update(|ed| ed.insert_text(&text));
        match result {
            Some(Ok(())) => {
                draft.set(String::new());
                on_change.run(());
            }
            Some(Err(e)) => warn!(error = %e, "text insertion rejected"),
            None => {}
        }
    };

    let new_paragraph = move |_| {
        editor.update(|ed| {
            let end = ed.doc().content_size();
            ed.set_caret(end);
        });
        insert_draft();
    };

    let on_click = move |ev: web_sys::MouseEvent| {
        let Some(target) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        else {
            return;
        };

        if let Ok(Some(anchor)) = target.closest("a") {
            let href = anchor.get_attribute("href").unwrap_or_default();
            if let Some(id) = child_link_target(&href, &anchor.class_name()) {
                ev.prevent_default();
                on_navigate.run(id.to_string());
                return;
            }
        }

        if let Ok(Some(block)) = target.closest("[data-pos]") {
            let offset = |name: &str| {
                block
                    .get_attribute(name)
                    .and_then(|p| p.parse::<usize>().ok())
            };
            let Some(pos) = offset("data-pos") else {
                return;
            };
            if ev.shift_key() {
                // Cover the whole clicked block, whichever side of the anchor it is on.
                let start = offset("data-start").unwrap_or(pos);
                editor.update(|ed| {
                    let anchor = ed.selection().anchor;
                    let head = if start < anchor { start } else { pos };
                    ed.set_selection(Selection { anchor, head });
                });
            } else {
                editor.update(|ed| ed.set_caret(pos));
            }
        }
    };

    let body = move || {
        editor.with(|ed| {
            let mut headings = 0;
            render_children(ed.doc(), 0, ed.selection(), &mut headings)
        })
    };

    view! {
        <div class="flex flex-col gap-3">
            <div class="flex flex-wrap items-center gap-1">
                <Button variant=ButtonVariant::Ghost size=ButtonSize::Icon attr:title="Move block up" on:click=move_up>
                    <ChevronUp />
                </Button>
                <Button variant=ButtonVariant::Ghost size=ButtonSize::Icon attr:title="Move block down" on:click=move_down>
                    <ChevronDown />
                </Button>
                {format_ops()
                    .into_iter()
                    .map(move |(label, title, op)| {
                        view! {
                            <Button
                                variant=ButtonVariant::Ghost
                                size=ButtonSize::Xs
                                attr:title=title
                                on:click=move |_| edit(title, op)
                            >
                                {label}
                            </Button>
                        }
                    })
                    .collect_view()}
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Xs
                    attr:disabled=move || !editor.with(EditorHandle::can_undo)
                    on:click=undo
                >
                    "Undo"
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Xs
                    attr:disabled=move || !editor.with(EditorHandle::can_redo)
                    on:click=redo
                >
                    "Redo"
                </Button>
            </div>

            <article class="prose max-w-none min-h-[40vh]" on:click=on_click>
                {body}
            </article>

            <form
                class="flex items-center gap-2"
                on:submit=move |ev: leptos::ev::SubmitEvent| {
                    ev.prevent_default();
                    insert_draft();
                }
            >
                <Input bind_value=draft placeholder="Type at the caret…" class="h-8 text-sm" />
                <Button size=ButtonSize::Sm attr:r#type="submit">"Insert"</Button>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    attr:r#type="button"
                    on:click=new_paragraph
                >
                    "New paragraph"
                </Button>
            </form>
        </div>
    }
}

/// Children of `parent`, whose content starts at `start`.
fn render_children(
    parent: &ContentNode,
    start: usize,
    selection: Selection,
    headings: &mut usize,
) -> Vec<AnyView> {
    let mut pos = start;
    let mut out = Vec::with_capacity(parent.content.len());
    for child in &parent.content {
        out.push(render_node(child, pos, selection, headings));
        pos += child.node_size();
    }
    out
}

/// `pos` is the position directly before `node`.
fn render_node(
    node: &ContentNode,
    pos: usize,
    selection: Selection,
    headings: &mut usize,
) -> AnyView {
    if node.kind.is_textblock() {
        let start = pos + 1;
        let end = start + node.content_size();
        let active = selection.from() <= end && selection.to() >= start;
        let class = if active { "rounded ring-1 ring-ring/40" } else { "" };
        let start = start.to_string();
        let end = end.to_string();
        let inline = render_inline(&node.content);
        return match node.kind {
            NodeKind::Heading => {
                *headings += 1;
                let id = heading_anchor_id(*headings);
                let class = format!("scroll-mt-20 {class}");
                let level = node.attr_i64("level").unwrap_or(1).clamp(1, 6);
                match level {
                    1 => view! { <h1 id=id class=class data-start=start data-pos=end>{inline}</h1> }.into_any(),
                    2 => view! { <h2 id=id class=class data-start=start data-pos=end>{inline}</h2> }.into_any(),
                    3 => view! { <h3 id=id class=class data-start=start data-pos=end>{inline}</h3> }.into_any(),
                    4 => view! { <h4 id=id class=class data-start=start data-pos=end>{inline}</h4> }.into_any(),
                    5 => view! { <h5 id=id class=class data-start=start data-pos=end>{inline}</h5> }.into_any(),
                    _ => view! { <h6 id=id class=class data-start=start data-pos=end>{inline}</h6> }.into_any(),
                }
            }
            NodeKind::CodeBlock => {
                view! { <pre class=class data-start=start data-pos=end><code>{node.text_content()}</code></pre> }.into_any()
            }
            _ => view! { <p class=class data-start=start data-pos=end>{inline}</p> }.into_any(),
        };
    }

    let inner = pos + 1;
    let after = inner.to_string();
    match node.kind {
        NodeKind::BulletList => {
            view! { <ul>{render_children(node, inner, selection, headings)}</ul> }.into_any()
        }
        NodeKind::OrderedList => {
            let start = node.attr_i64("start").unwrap_or(1).to_string();
            view! { <ol start=start>{render_children(node, inner, selection, headings)}</ol> }.into_any()
        }
        NodeKind::TaskList => {
            view! { <ul class="list-none pl-0">{render_children(node, inner, selection, headings)}</ul> }
                .into_any()
        }
        NodeKind::TaskItem => {
            let checked = node
                .attrs
                .get("checked")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            view! {
                <li class="flex items-start gap-2">
                    <input type="checkbox" checked=checked disabled=true />
                    <div>{render_children(node, inner, selection, headings)}</div>
                </li>
            }
            .into_any()
        }
        NodeKind::ListItem => {
            view! { <li>{render_children(node, inner, selection, headings)}</li> }.into_any()
        }
        NodeKind::Blockquote => {
            view! { <blockquote>{render_children(node, inner, selection, headings)}</blockquote> }
                .into_any()
        }
        NodeKind::HorizontalRule => view! { <hr data-pos=after /> }.into_any(),
        NodeKind::Image => {
            let src = node.attr_str("src").unwrap_or_default().to_string();
            let alt = node.attr_str("alt").unwrap_or_default().to_string();
            view! { <img src=src alt=alt class="max-w-full rounded" data-pos=after /> }.into_any()
        }
        NodeKind::Doc => render_children(node, inner, selection, headings).into_any(),
        // Inline nodes are rendered by their textblock.
        NodeKind::Text | NodeKind::HardBreak => render_inline(std::slice::from_ref(node)).into_any(),
        NodeKind::Paragraph | NodeKind::Heading | NodeKind::CodeBlock => ().into_any(),
    }
}

fn render_inline(runs: &[ContentNode]) -> Vec<AnyView> {
    runs.iter()
        .map(|run| match run.kind {
            NodeKind::HardBreak => view! { <br /> }.into_any(),
            _ => run
                .marks
                .iter()
                .rev()
                .fold(run.text_str().to_string().into_any(), wrap_mark),
        })
        .collect()
}

fn wrap_mark(inner: AnyView, mark: &Mark) -> AnyView {
    match mark.kind {
        MarkKind::Bold => view! { <strong>{inner}</strong> }.into_any(),
        MarkKind::Italic => view! { <em>{inner}</em> }.into_any(),
        MarkKind::Underline => view! { <u>{inner}</u> }.into_any(),
        MarkKind::Strike => view! { <s>{inner}</s> }.into_any(),
        MarkKind::Code => view! { <code>{inner}</code> }.into_any(),
        MarkKind::Link => {
            let href = mark.attr_str("href").unwrap_or_default().to_string();
            let target = mark.attr_str("target").map(str::to_string);
            let class = mark.attr_str("class").unwrap_or_default().to_string();
            view! { <a href=href target=target class=class>{inner}</a> }.into_any()
        }
    }
}
