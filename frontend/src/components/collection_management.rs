use shared::{month_name, CollectionSaveRequest, CollectionUpdateRequest, Region, Role};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::excel_import::ExcelImport;
use crate::components::{confirm, current_year, year_range};
use crate::core::analytics::achievement_percent;
use crate::core::reconcile::{
    begin_check, begin_submit, due_amount, on_check_result, on_confirm_declined, on_submit_result,
    plan_submit, AmountField, Draft, ExistingRecord, RecordKind, SubmitOutcome, SubmitPlan,
    UpsertState,
};
use crate::hooks::use_branches::use_branches;
use crate::services::api::{ApiClient, ApiError};
use crate::services::session::Session;

#[derive(Properties, PartialEq)]
pub struct CollectionManagementProps {
    pub api_client: ApiClient,
    pub on_unauthorized: Callback<()>,
}

/// Create-or-update screen for monthly collections. Same flow as targets
/// with one extra precondition: the period must already have a target,
/// which also backs the due and achievement figures shown under the form.
#[function_component(CollectionManagement)]
pub fn collection_management(props: &CollectionManagementProps) -> Html {
    let role = Session::role().unwrap_or(Role::User);
    let own_branch = (!role.is_admin())
        .then(|| Session::branch_id().zip(Session::branch_name()))
        .flatten();

    let regions = use_state(Vec::<Region>::new);
    let selected_region = use_state(|| None::<i64>);
    let branches = use_branches(&props.api_client);
    let selected_branch = use_state(|| own_branch.as_ref().map(|(id, _)| *id));
    let year = use_state(current_year);
    let month = use_state(|| None::<u32>);
    let amount = use_state(String::new);
    let backing_target = use_state(|| None::<f64>);
    let upsert = use_state(|| UpsertState::Idle);
    let notice = use_state(|| None::<(String, bool)>);
    let refresh = use_state(|| 0u32);
    let check_seq = use_mut_ref(|| 0u64);

    {
        let api_client = props.api_client.clone();
        let regions = regions.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        use_effect_with((), move |_| {
            if role.is_admin() {
                spawn_local(async move {
                    match api_client.list_regions().await {
                        Ok(list) => regions.set(list),
                        Err(e) if e.is_unauthorized() => on_unauthorized.emit(()),
                        Err(e) => gloo::console::error!(format!("loading regions: {e}")),
                    }
                });
            }
            || ()
        });
    }

    // On a complete selection, load the backing target and then check for
    // an existing collection.
    {
        let api_client = props.api_client.clone();
        let upsert = upsert.clone();
        let amount = amount.clone();
        let backing_target = backing_target.clone();
        let notice = notice.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        let check_seq = check_seq.clone();
        let deps = (*selected_branch, *year, *month, *refresh);
        use_effect_with(deps, move |(branch_id, year, month, _)| {
            let seq = {
                let mut guard = check_seq.borrow_mut();
                *guard += 1;
                *guard
            };
            match (branch_id, month) {
                (Some(branch_id), Some(month)) => {
                    let branch_id = *branch_id;
                    let year = *year;
                    let month = *month;
                    upsert.set(begin_check());
                    notice.set(None);
                    backing_target.set(None);
                    spawn_local(async move {
                        let target = match api_client
                            .target_by_branch_period(branch_id, year, month)
                            .await
                        {
                            Ok(target) => Some(target.amount),
                            Err(ApiError::NotFound) => None,
                            Err(e) if e.is_unauthorized() => {
                                on_unauthorized.emit(());
                                return;
                            }
                            Err(e) => {
                                if *check_seq.borrow() == seq {
                                    upsert.set(UpsertState::Idle);
                                    notice.set(Some((e.to_string(), false)));
                                }
                                return;
                            }
                        };

                        let response = api_client
                            .collection_by_branch_period(branch_id, year, month)
                            .await;
                        if *check_seq.borrow() != seq {
                            return;
                        }
                        backing_target.set(target);

                        let found = match response {
                            Ok(collection) => Some(ExistingRecord {
                                id: collection.id,
                                amount: collection.amount,
                            }),
                            Err(ApiError::NotFound) => None,
                            Err(e) if e.is_unauthorized() => {
                                on_unauthorized.emit(());
                                return;
                            }
                            Err(e) => {
                                upsert.set(UpsertState::Idle);
                                notice.set(Some((e.to_string(), false)));
                                return;
                            }
                        };
                        let outcome =
                            on_check_result(RecordKind::Collection, role, found, year, month);
                        match outcome.amount_field {
                            AmountField::Clear => amount.set(String::new()),
                            AmountField::Prefill(value) => amount.set(value.to_string()),
                        }
                        if let Some(text) = outcome.notice {
                            notice.set(Some((text, false)));
                        } else if target.is_none() {
                            notice.set(Some((
                                format!(
                                    "No target is set for {} {}; create the target first",
                                    month_name(month),
                                    year
                                ),
                                false,
                            )));
                        }
                        upsert.set(outcome.state);
                    });
                }
                _ => upsert.set(UpsertState::Idle),
            }
            || ()
        });
    }

    let on_region_change = {
        let selected_region = selected_region.clone();
        let selected_branch = selected_branch.clone();
        let load_for_region = branches.load_for_region.clone();
        let clear_branches = branches.clear.clone();
        Callback::from(move |e: Event| {
            let select: HtmlInputElement = e.target_unchecked_into();
            selected_branch.set(None);
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

    let on_branch_change = {
        let selected_branch = selected_branch.clone();
        Callback::from(move |e: Event| {
            let select: HtmlInputElement = e.target_unchecked_into();
            selected_branch.set(select.value().parse::<i64>().ok());
        })
    };

    let on_year_change = {
        let year = year.clone();
        Callback::from(move |e: Event| {
            let select: HtmlInputElement = e.target_unchecked_into();
            if let Ok(value) = select.value().parse::<i32>() {
                year.set(value);
            }
        })
    };

    let on_month_change = {
        let month = month.clone();
        Callback::from(move |e: Event| {
            let select: HtmlInputElement = e.target_unchecked_into();
            month.set(select.value().parse::<u32>().ok());
        })
    };

    let on_amount_input = {
        let amount = amount.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            amount.set(input.value());
        })
    };

    let branch_name = own_branch
        .as_ref()
        .map(|(_, name)| name.clone())
        .or_else(|| {
            branches
                .branches
                .iter()
                .find(|b| Some(b.id) == *selected_branch)
                .map(|b| b.name.clone())
        })
        .unwrap_or_default();

    let on_submit = {
        let api_client = props.api_client.clone();
        let upsert = upsert.clone();
        let notice = notice.clone();
        let refresh = refresh.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        let selected_branch = selected_branch.clone();
        let year = year.clone();
        let month = month.clone();
        let amount = amount.clone();
        let backing_target = backing_target.clone();
        let branch_name = branch_name.clone();

        Callback::from(move |_: MouseEvent| {
            let draft = Draft {
                branch_id: *selected_branch,
                year: *year,
                month: (*month).unwrap_or(0),
                amount: amount.parse::<f64>().unwrap_or(0.0),
                backing_target: *backing_target,
            };
            let plan = plan_submit(RecordKind::Collection, &upsert, role, &draft, &branch_name);

            let request = match plan {
                SubmitPlan::Refuse(reason) => {
                    notice.set(Some((reason, false)));
                    return;
                }
                SubmitPlan::Create => None,
                SubmitPlan::ConfirmUpdate(summary) => {
                    if !confirm(&summary.prompt(RecordKind::Collection)) {
                        upsert.set(on_confirm_declined((*upsert).clone()));
                        return;
                    }
                    Some(summary.record_id)
                }
            };

            let api_client = api_client.clone();
            let upsert = upsert.clone();
            let notice = notice.clone();
            let refresh = refresh.clone();
            let on_unauthorized = on_unauthorized.clone();

            let submitting = begin_submit(&upsert);
            upsert.set(submitting.clone());
            spawn_local(async move {
                let result = match request {
                    None => api_client
                        .create_collection(&CollectionSaveRequest {
                            branch_id: draft.branch_id.unwrap_or_default(),
                            year: draft.year,
                            month: draft.month,
                            amount: draft.amount,
                        })
                        .await
                        .map(|_| ()),
                    Some(record_id) => {
                        // Due always comes from the current target, never a
                        // previously loaded record.
                        let target = draft.backing_target.unwrap_or_default();
                        api_client
                            .update_collection(
                                record_id,
                                &CollectionUpdateRequest {
                                    target,
                                    due: due_amount(target, draft.amount),
                                    amount: draft.amount,
                                    year: draft.year,
                                    month: draft.month,
                                },
                            )
                            .await
                            .map(|_| ())
                    }
                };
                if let Err(e) = &result {
                    if e.is_unauthorized() {
                        on_unauthorized.emit(());
                        return;
                    }
                }
                let (next, outcome) =
                    on_submit_result(submitting, result.map_err(|e| e.to_string()));
                upsert.set(next);
                match outcome {
                    SubmitOutcome::Refresh => {
                        notice.set(Some(("Collection saved".to_string(), true)));
                        refresh.set(*refresh + 1);
                    }
                    SubmitOutcome::Reverted { message } => notice.set(Some((message, false))),
                }
            });
        })
    };

    let on_import_status = {
        let notice = notice.clone();
        let refresh = refresh.clone();
        Callback::from(move |(message, success): (String, bool)| {
            notice.set(Some((message, success)));
            if success {
                refresh.set(*refresh + 1);
            }
        })
    };

    let in_flight = upsert.in_flight();
    let entered = amount.parse::<f64>().unwrap_or(0.0);
    let preview = backing_target.map(|target| {
        (
            due_amount(target, entered),
            achievement_percent(target, entered),
        )
    });

    let submit_label = match (&*upsert, in_flight) {
        (_, true) => "Working...",
        (UpsertState::UpdateReady { .. }, _) => "Update collection",
        _ => "Save collection",
    };

    html! {
        <div class="management-view">
            <h2>{"Branch collections"}</h2>
            {if let Some((text, success)) = (*notice).clone() {
                let class = if success { "form-message success" } else { "form-message error" };
                html! { <div class={class}>{text}</div> }
            } else {
                html! {}
            }}
            <div class="record-form">
                {if let Some((_, name)) = own_branch.as_ref() {
                    html! {
                        <div class="form-row">
                            <label>{"Branch"}</label>
                            <span class="fixed-branch">{name.clone()}</span>
                        </div>
                    }
                } else {
                    html! {
                        <>
                            <div class="form-row">
                                <label>{"Region"}</label>
                                <select onchange={on_region_change} disabled={in_flight}>
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
                            <div class="form-row">
                                <label>{"Branch"}</label>
                                <select onchange={on_branch_change} disabled={in_flight || *branches.loading}>
                                    <option value="" selected={selected_branch.is_none()}>{"Select a branch"}</option>
                                    {for branches.branches.iter().map(|branch| html! {
                                        <option
                                            value={branch.id.to_string()}
                                            selected={Some(branch.id) == *selected_branch}
                                        >
                                            {branch.name.clone()}
                                        </option>
                                    })}
                                </select>
                            </div>
                        </>
                    }
                }}
                <div class="form-row">
                    <label>{"Year"}</label>
                    <select onchange={on_year_change} disabled={in_flight}>
                        {for year_range().map(|y| html! {
                            <option value={y.to_string()} selected={y == *year}>{y}</option>
                        })}
                    </select>
                    <label>{"Month"}</label>
                    <select onchange={on_month_change} disabled={in_flight}>
                        <option value="" selected={month.is_none()}>{"Select a month"}</option>
                        {for (1..=12u32).map(|m| html! {
                            <option value={m.to_string()} selected={Some(m) == *month}>{month_name(m)}</option>
                        })}
                    </select>
                </div>
                <div class="form-row">
                    <label>{"Target for period"}</label>
                    <span>{backing_target.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())}</span>
                </div>
                {if let Some(existing) = upsert.existing() {
                    html! {
                        <div class="form-row existing-record">
                            <label>{"Current collection"}</label>
                            <span>{existing.amount}</span>
                        </div>
                    }
                } else {
                    html! {}
                }}
                <div class="form-row">
                    <label>{"Collected amount"}</label>
                    <input
                        type="number"
                        min="0"
                        step="0.01"
                        value={(*amount).clone()}
                        oninput={on_amount_input}
                        disabled={in_flight || (upsert.is_update_mode() && !role.is_admin())}
                    />
                </div>
                {if let Some((due, percent)) = preview {
                    html! {
                        <div class="form-row preview">
                            <label>{"Due"}</label>
                            <span>{due}</span>
                            <label>{"Achievement"}</label>
                            <span>{format!("{percent}%")}</span>
                        </div>
                    }
                } else {
                    html! {}
                }}
                <button class="btn btn-primary" onclick={on_submit} disabled={in_flight}>
                    {submit_label}
                </button>
            </div>
            {if role.is_admin() {
                html! {
                    <ExcelImport
                        kind={RecordKind::Collection}
                        api_client={props.api_client.clone()}
                        on_status={on_import_status}
                    />
                }
            } else {
                html! {}
            }}
        </div>
    }
}
