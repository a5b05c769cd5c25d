use crate::components::ui::{
    Button, ButtonSize, ButtonVariant, Card, CardContent, CardHeader, CardTitle, ErrorNotice,
    Input, Spinner,
};
use crate::media::{check_picked_file, MediaStore, MediaUpload};
use crate::models::MediaImage;
use crate::state::AppContext;
use icons::X;
use leptos::prelude::*;
use leptos::task::spawn_local;
use tracing::{info, warn};
use wasm_bindgen::JsCast;

/// Image picker: library grid, file upload, or a pasted URL.
///
/// `on_pick` receives the image source and an optional alt text.
#[component]
pub fn MediaPanel(
    #[prop(into)] on_pick: Callback<(String, Option<String>)>,
    #[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let max_upload_bytes = app_state.0.config().max_upload_bytes;

    let images: RwSignal<Vec<MediaImage>> = RwSignal::new(vec![]);
    let loading: RwSignal<bool> = RwSignal::new(false);
    let uploading: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let url_value: RwSignal<String> = RwSignal::new(String::new());

    let state_for_load = app_state.clone();
    Effect::new(move |_| {
        let api_client = state_for_load.0.api_client.get_untracked();
        let state = state_for_load.clone();
        loading.set(true);
        spawn_local(async move {
            match api_client.list_media().await {
                Ok(list) => images.set(list),
                Err(e) => {
                    state.0.handle_error(&e);
                    error.set(Some(e.to_string()));
                }
            }
            loading.set(false);
        });
    });

    let state_for_upload = app_state.clone();
    let start_upload = move |upload: MediaUpload| {
        let api_client = state_for_upload.0.api_client.get_untracked();
        let state = state_for_upload.clone();
        uploading.set(true);
        error.set(None);
        spawn_local(async move {
            let name = upload.file_name.clone();
            match api_client.upload(upload).await {
                Ok(uploaded) => {
                    info!(url = %uploaded.url, "image uploaded");
                    on_pick.run((uploaded.url, Some(name)));
                }
                Err(e) => {
                    state.0.handle_error(&e);
                    error.set(Some(e.to_string()));
                }
            }
            uploading.set(false);
        });
    };

    let on_file = move |ev: web_sys::Event| {
        let Some(input) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let Some(file) = input.files().and_then(|list| list.get(0)) else {
            return;
        };
        input.set_value("");

        if let Err(e) = check_picked_file(&file.type_(), file.size() as u64, max_upload_bytes) {
            error.set(Some(e.to_string()));
            return;
        }

        let Ok(reader) = web_sys::FileReader::new() else {
            error.set(Some("Could not read the selected file.".to_string()));
            return;
        };
        let file_name = file.name();
        let content_type = file.type_();

        let reader_for_load = reader.clone();
        let start_upload = start_upload.clone();
        let onload = wasm_bindgen::closure::Closure::once_into_js(move || {
            let Ok(result) = reader_for_load.result() else {
                warn!("file reader finished without a result");
                return;
            };
            let bytes = js_sys::Uint8Array::new(&result).to_vec();
            start_upload(MediaUpload {
                file_name,
                content_type,
                bytes,
            });
        });
        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        if reader.read_as_array_buffer(&file).is_err() {
            error.set(Some("Could not read the selected file.".to_string()));
        }
    };

    let insert_url = move || {
        let url = url_value.get_untracked().trim().to_string();
        if url.is_empty() {
            return;
        }
        url_value.set(String::new());
        on_pick.run((url, None));
    };

    view! {
        <Card class="gap-3 py-4">
            <CardHeader class="flex-row items-center justify-between px-4">
                <CardTitle class="text-sm">"Insert image"</CardTitle>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Close"
                    on:click=move |_| on_close.run(())
                >
                    <X />
                </Button>
            </CardHeader>
            <CardContent class="flex flex-col gap-3 px-4">
                <ErrorNotice message=error />

                <Show
                    when=move || !loading.get()
                    fallback=|| view! { <Spinner class="mx-auto text-muted-foreground" /> }
                >
                    <Show
                        when=move || !images.with(Vec::is_empty)
                        fallback=|| view! { <p class="text-xs text-muted-foreground">"No images yet."</p> }
                    >
                        <div class="grid max-h-64 grid-cols-3 gap-2 overflow-y-auto">
                            <For
                                each=move || images.get()
                                key=|img| img.url.clone()
                                let:img
                            >
                                {
                                    let MediaImage { name, url } = img;
                                    let src = url.clone();
                                    let alt = name.clone();
                                    let title = name.clone();
                                    view! {
                                        <button
                                            type="button"
                                            class="overflow-hidden rounded-md border hover:ring-2 hover:ring-ring/50"
                                            title=title
                                            on:click=move |_| on_pick.run((url.clone(), Some(name.clone())))
                                        >
                                            <img src=src alt=alt class="aspect-square w-full object-cover" />
                                        </button>
                                    }
                                }
                            </For>
                        </div>
                    </Show>
                </Show>

                <label class="flex items-center gap-2 text-xs">
                    <span class="text-muted-foreground">"Upload"</span>
                    <input
                        type="file"
                        accept="image/jpeg,image/png,image/gif,image/webp"
                        class="text-xs"
                        disabled=move || uploading.get()
                        on:change=on_file
                    />
                    <Show when=move || uploading.get() fallback=|| ()>
                        <Spinner class="size-3" />
                    </Show>
                </label>

                <form
                    class="flex items-center gap-2"
                    on:submit=move |ev: leptos::ev::SubmitEvent| {
                        ev.prevent_default();
                        insert_url();
                    }
                >
                    <Input bind_value=url_value placeholder="https://…" class="h-8 text-sm" />
                    <Button size=ButtonSize::Sm attr:r#type="submit">"Insert"</Button>
                </form>
            </CardContent>
        </Card>
    }
}
