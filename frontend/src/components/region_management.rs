use shared::{Region, RegionSaveRequest};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::confirm;
use crate::services::api::ApiClient;

#[derive(Properties, PartialEq)]
pub struct RegionManagementProps {
    pub api_client: ApiClient,
    pub on_unauthorized: Callback<()>,
}

/// Admin CRUD over regions.
#[function_component(RegionManagement)]
pub fn region_management(props: &RegionManagementProps) -> Html {
    let regions = use_state(Vec::<Region>::new);
    let name = use_state(String::new);
    let description = use_state(String::new);
    let editing = use_state(|| None::<i64>);
    let notice = use_state(|| None::<(String, bool)>);
    let busy = use_state(|| false);
    let reload = use_state(|| 0u32);

    {
        let api_client = props.api_client.clone();
        let regions = regions.clone();
        let notice = notice.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        use_effect_with(*reload, move |_| {
            spawn_local(async move {
                match api_client.list_regions().await {
                    Ok(list) => regions.set(list),
                    Err(e) if e.is_unauthorized() => on_unauthorized.emit(()),
                    Err(e) => notice.set(Some((e.to_string(), false))),
                }
            });
            || ()
        });
    }

    let on_name = {
        let name = name.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            name.set(input.value());
        })
    };

    let on_description = {
        let description = description.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            description.set(input.value());
        })
    };

    let on_save = {
        let api_client = props.api_client.clone();
        let name = name.clone();
        let description = description.clone();
        let editing = editing.clone();
        let notice = notice.clone();
        let busy = busy.clone();
        let reload = reload.clone();
        let on_unauthorized = props.on_unauthorized.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            let request = RegionSaveRequest {
                name: name.trim().to_string(),
                description: description.trim().to_string(),
            };
            if request.name.is_empty() {
                notice.set(Some(("Region name is required".to_string(), false)));
                return;
            }

            let api_client = api_client.clone();
            let name = name.clone();
            let description = description.clone();
            let editing = editing.clone();
            let notice = notice.clone();
            let busy = busy.clone();
            let reload = reload.clone();
            let on_unauthorized = on_unauthorized.clone();
            let edit_id = *editing;

            busy.set(true);
            spawn_local(async move {
                let result = match edit_id {
                    Some(id) => api_client.update_region(id, &request).await,
                    None => api_client.create_region(&request).await,
                };
                match result {
                    Ok(region) => {
                        notice.set(Some((format!("Region {} saved", region.name), true)));
                        name.set(String::new());
                        description.set(String::new());
                        editing.set(None);
                        reload.set(*reload + 1);
                    }
                    Err(e) if e.is_unauthorized() => {
                        on_unauthorized.emit(());
                        return;
                    }
                    Err(e) => notice.set(Some((e.to_string(), false))),
                }
                busy.set(false);
            });
        })
    };

    let on_edit = {
        let name = name.clone();
        let description = description.clone();
        let editing = editing.clone();
        Callback::from(move |region: Region| {
            name.set(region.name);
            description.set(region.description);
            editing.set(Some(region.id));
        })
    };

    let on_cancel_edit = {
        let name = name.clone();
        let description = description.clone();
        let editing = editing.clone();
        Callback::from(move |_: MouseEvent| {
            name.set(String::new());
            description.set(String::new());
            editing.set(None);
        })
    };

    let on_delete = {
        let api_client = props.api_client.clone();
        let notice = notice.clone();
        let busy = busy.clone();
        let reload = reload.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        Callback::from(move |region: Region| {
            if *busy {
                return;
            }
            let prompt = format!(
                "Delete region {}? Its branches and their records will no longer be reachable.",
                region.name
            );
            if !confirm(&prompt) {
                return;
            }
            let api_client = api_client.clone();
            let notice = notice.clone();
            let busy = busy.clone();
            let reload = reload.clone();
            let on_unauthorized = on_unauthorized.clone();

            busy.set(true);
            spawn_local(async move {
                match api_client.delete_region(region.id).await {
                    Ok(()) => {
                        notice.set(Some((format!("Region {} deleted", region.name), true)));
                        reload.set(*reload + 1);
                    }
                    Err(e) if e.is_unauthorized() => {
                        on_unauthorized.emit(());
                        return;
                    }
                    Err(e) => notice.set(Some((e.to_string(), false))),
                }
                busy.set(false);
            });
        })
    };

    html! {
        <div class="management-view">
            <h2>{"Regions"}</h2>
            {if let Some((text, success)) = (*notice).clone() {
                let class = if success { "form-message success" } else { "form-message error" };
                html! { <div class={class}>{text}</div> }
            } else {
                html! {}
            }}
            <form class="record-form" onsubmit={on_save}>
                <div class="form-row">
                    <label>{"Name"}</label>
                    <input type="text" value={(*name).clone()} oninput={on_name} disabled={*busy} />
                </div>
                <div class="form-row">
                    <label>{"Description"}</label>
                    <input type="text" value={(*description).clone()} oninput={on_description} disabled={*busy} />
                </div>
                <div class="form-row">
                    <button type="submit" class="btn btn-primary" disabled={*busy}>
                        {if editing.is_some() { "Update region" } else { "Add region" }}
                    </button>
                    {if editing.is_some() {
                        html! {
                            <button type="button" class="btn" onclick={on_cancel_edit} disabled={*busy}>
                                {"Cancel"}
                            </button>
                        }
                    } else {
                        html! {}
                    }}
                </div>
            </form>
            <table class="records-table">
                <thead>
                    <tr>
                        <th>{"Name"}</th>
                        <th>{"Description"}</th>
                        <th>{"Actions"}</th>
                    </tr>
                </thead>
                <tbody>
                    {for regions.iter().cloned().map(|region| {
                        let edit = {
                            let on_edit = on_edit.clone();
                            let region = region.clone();
                            Callback::from(move |_: MouseEvent| on_edit.emit(region.clone()))
                        };
                        let delete = {
                            let on_delete = on_delete.clone();
                            let region = region.clone();
                            Callback::from(move |_: MouseEvent| on_delete.emit(region.clone()))
                        };
                        html! {
                            <tr>
                                <td>{region.name.clone()}</td>
                                <td>{region.description.clone()}</td>
                                <td>
                                    <button class="btn btn-small" onclick={edit}>{"Edit"}</button>
                                    <button class="btn btn-small btn-danger" onclick={delete}>{"Delete"}</button>
                                </td>
                            </tr>
                        }
                    })}
                </tbody>
            </table>
        </div>
    }
}
