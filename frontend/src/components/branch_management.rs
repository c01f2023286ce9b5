use shared::{Branch, BranchSaveRequest, Region};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::confirm;
use crate::hooks::use_branches::use_branches;
use crate::services::api::ApiClient;

#[derive(Properties, PartialEq)]
pub struct BranchManagementProps {
    pub api_client: ApiClient,
    pub on_unauthorized: Callback<()>,
}

/// Admin CRUD over branches, always scoped to a selected region.
#[function_component(BranchManagement)]
pub fn branch_management(props: &BranchManagementProps) -> Html {
    let regions = use_state(Vec::<Region>::new);
    let selected_region = use_state(|| None::<i64>);
    let branches = use_branches(&props.api_client);
    let name = use_state(String::new);
    let description = use_state(String::new);
    let editing = use_state(|| None::<i64>);
    let notice = use_state(|| None::<(String, bool)>);
    let busy = use_state(|| false);

    {
        let api_client = props.api_client.clone();
        let regions = regions.clone();
        let notice = notice.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        use_effect_with((), move |_| {
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

    let on_region_change = {
        let selected_region = selected_region.clone();
        let load_for_region = branches.load_for_region.clone();
        let clear_branches = branches.clear.clone();
        let editing = editing.clone();
        Callback::from(move |e: Event| {
            let select: HtmlInputElement = e.target_unchecked_into();
            editing.set(None);
            match select.value().parse::<i64>() {
                Ok(region_id) => {
                    selected_region.set(Some(region_id));
                    load_for_region.emit(region_id);
                }
                Err(_) => {
                    selected_region.set(None);
                    clear_branches.emit(());
                }
            }
        })
    };

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

    let reload_current = {
        let selected_region = selected_region.clone();
        let load_for_region = branches.load_for_region.clone();
        Callback::from(move |_: ()| {
            if let Some(region_id) = *selected_region {
                load_for_region.emit(region_id);
            }
        })
    };

    let on_save = {
        let api_client = props.api_client.clone();
        let selected_region = selected_region.clone();
        let name = name.clone();
        let description = description.clone();
        let editing = editing.clone();
        let notice = notice.clone();
        let busy = busy.clone();
        let reload_current = reload_current.clone();
        let on_unauthorized = props.on_unauthorized.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            let Some(region_id) = *selected_region else {
                notice.set(Some(("Please select a region first".to_string(), false)));
                return;
            };
            let request = BranchSaveRequest {
                name: name.trim().to_uppercase(),
                description: description.trim().to_string(),
                region_id,
            };
            if request.name.is_empty() {
                notice.set(Some(("Branch name is required".to_string(), false)));
                return;
            }

            let api_client = api_client.clone();
            let name = name.clone();
            let description = description.clone();
            let editing = editing.clone();
            let notice = notice.clone();
            let busy = busy.clone();
            let reload_current = reload_current.clone();
            let on_unauthorized = on_unauthorized.clone();
            let edit_id = *editing;

            busy.set(true);
            spawn_local(async move {
                let result = match edit_id {
                    Some(id) => api_client.update_branch(id, &request).await,
                    None => api_client.create_branch(&request).await,
                };
                match result {
                    Ok(branch) => {
                        notice.set(Some((format!("Branch {} saved", branch.name), true)));
                        name.set(String::new());
                        description.set(String::new());
                        editing.set(None);
                        reload_current.emit(());
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
        Callback::from(move |branch: Branch| {
            name.set(branch.name);
            description.set(branch.description);
            editing.set(Some(branch.id));
        })
    };

    let on_delete = {
        let api_client = props.api_client.clone();
        let notice = notice.clone();
        let busy = busy.clone();
        let reload_current = reload_current.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        Callback::from(move |branch: Branch| {
            if *busy {
                return;
            }
            if !confirm(&format!("Delete branch {}?", branch.name)) {
                return;
            }
            let api_client = api_client.clone();
            let notice = notice.clone();
            let busy = busy.clone();
            let reload_current = reload_current.clone();
            let on_unauthorized = on_unauthorized.clone();

            busy.set(true);
            spawn_local(async move {
                match api_client.delete_branch(branch.id).await {
                    Ok(()) => {
                        notice.set(Some((format!("Branch {} deleted", branch.name), true)));
                        reload_current.emit(());
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
            <h2>{"Branches"}</h2>
            {if let Some((text, success)) = (*notice).clone() {
                let class = if success { "form-message success" } else { "form-message error" };
                html! { <div class={class}>{text}</div> }
            } else {
                html! {}
            }}
            <div class="form-row">
                <label>{"Region"}</label>
                <select onchange={on_region_change}>
                    <option value="" selected={selected_region.is_none()}>{"Select a region"}</option>
                    {for regions.iter().map(|region| html! {
                        <option
                            value={region.id.to_string()}
                            selected={Some(region.id) == *selected_region}
                        >
                            {region.name.clone()}
                        </option>
                    })}
                </select>
            </div>
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
                        {if editing.is_some() { "Update branch" } else { "Add branch" }}
                    </button>
                </div>
            </form>
            {if *branches.loading {
                html! { <p class="loading">{"Loading branches..."}</p> }
            } else {
                html! {
                    <table class="records-table">
                        <thead>
                            <tr>
                                <th>{"Name"}</th>
                                <th>{"Description"}</th>
                                <th>{"Region"}</th>
                                <th>{"Actions"}</th>
                            </tr>
                        </thead>
                        <tbody>
                            {for branches.branches.iter().cloned().map(|branch| {
                                let edit = {
                                    let on_edit = on_edit.clone();
                                    let branch = branch.clone();
                                    Callback::from(move |_: MouseEvent| on_edit.emit(branch.clone()))
                                };
                                let delete = {
                                    let on_delete = on_delete.clone();
                                    let branch = branch.clone();
                                    Callback::from(move |_: MouseEvent| on_delete.emit(branch.clone()))
                                };
                                html! {
                                    <tr>
                                        <td>{branch.name.clone()}</td>
                                        <td>{branch.description.clone()}</td>
                                        <td>{branch.region.name.clone()}</td>
                                        <td>
                                            <button class="btn btn-small" onclick={edit}>{"Edit"}</button>
                                            <button class="btn btn-small btn-danger" onclick={delete}>{"Delete"}</button>
                                        </td>
                                    </tr>
                                }
                            })}
                        </tbody>
                    </table>
                }
            }}
        </div>
    }
}
