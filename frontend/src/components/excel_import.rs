use shared::{month_name, ExistingCheck};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::{confirm, current_year, year_range};
use crate::core::excel::{
    plan_collections_import, plan_targets_import, refine_upload_error, ImportDecision,
};
use crate::core::reconcile::RecordKind;
use crate::services::api::{ApiClient, ApiError};

#[derive(Properties, PartialEq)]
pub struct ExcelImportProps {
    pub kind: RecordKind,
    pub api_client: ApiClient,
    /// (message, is_success) once the import settles or is refused.
    pub on_status: Callback<(String, bool)>,
}

fn expected_sheet(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Target => "targets",
        RecordKind::Collection => "collections",
    }
}

/// Bulk .xlsx import for one (year, month). Preconditions run before any
/// upload: collections require targets for the period, and overwriting
/// existing records needs an explicit confirmation because there is no
/// undo.
#[function_component(ExcelImport)]
pub fn excel_import(props: &ExcelImportProps) -> Html {
    let year = use_state(current_year);
    let month = use_state(|| 1u32);
    let file_input = use_node_ref();
    let busy = use_state(|| false);

    let kind = props.kind;
    let noun = kind.noun();

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
            if let Ok(value) = select.value().parse::<u32>() {
                month.set(value);
            }
        })
    };

    let on_import = {
        let api_client = props.api_client.clone();
        let on_status = props.on_status.clone();
        let file_input = file_input.clone();
        let year = year.clone();
        let month = month.clone();
        let busy = busy.clone();

        Callback::from(move |_: MouseEvent| {
            if *busy {
                return;
            }
            let Some(input) = file_input.cast::<HtmlInputElement>() else {
                return;
            };
            let Some(file) = input.files().and_then(|list| list.get(0)) else {
                on_status.emit((format!("Please choose an Excel file of {noun}s"), false));
                return;
            };

            let api_client = api_client.clone();
            let on_status = on_status.clone();
            let busy = busy.clone();
            let year = *year;
            let month = *month;

            busy.set(true);
            spawn_local(async move {
                let outcome = run_import(&api_client, kind, year, month, &file).await;
                match outcome {
                    Ok(Some(text)) => on_status.emit((text, true)),
                    // Cancelled at the overwrite prompt; nothing happened.
                    Ok(None) => {}
                    Err(message) => on_status.emit((message, false)),
                }
                busy.set(false);
            });
        })
    };

    html! {
        <div class="excel-import">
            <h3>{format!("Import {}s from Excel", noun)}</h3>
            <div class="form-row">
                <label>{"Year"}</label>
                <select onchange={on_year_change} disabled={*busy}>
                    {for year_range().map(|y| html! {
                        <option value={y.to_string()} selected={y == *year}>{y}</option>
                    })}
                </select>
                <label>{"Month"}</label>
                <select onchange={on_month_change} disabled={*busy}>
                    {for (1..=12u32).map(|m| html! {
                        <option value={m.to_string()} selected={m == *month}>{month_name(m)}</option>
                    })}
                </select>
            </div>
            <div class="form-row">
                <input type="file" accept=".xlsx" ref={file_input} disabled={*busy} />
                <button class="btn btn-primary" onclick={on_import} disabled={*busy}>
                    {if *busy { "Uploading..." } else { "Upload" }}
                </button>
            </div>
            <p class="hint">
                {format!("The workbook must contain a sheet named \"{}\" with branch name and amount columns.", expected_sheet(kind))}
            </p>
        </div>
    }
}

/// Check preconditions, confirm overwrites, and upload. Ok(None) means the
/// user declined the overwrite prompt.
async fn run_import(
    api_client: &ApiClient,
    kind: RecordKind,
    year: i32,
    month: u32,
    file: &web_sys::File,
) -> Result<Option<String>, String> {
    let check_targets = api_client
        .check_existing_targets(year, month)
        .await
        .map_err(|e| e.to_string())?;

    let (decision, overwrite_existing) = match kind {
        RecordKind::Target => (plan_targets_import(check_targets), false),
        RecordKind::Collection => {
            let check_collections: ExistingCheck = api_client
                .check_existing_collections(year, month)
                .await
                .map_err(|e| e.to_string())?;
            (
                plan_collections_import(check_targets, check_collections),
                true,
            )
        }
    };

    let use_update_endpoint = match decision {
        ImportDecision::Refuse(reason) => return Err(reason),
        ImportDecision::Proceed => false,
        ImportDecision::ConfirmOverwrite { existing } => {
            let prompt = format!(
                "{existing} {}(s) already exist for {} {year}. \
                 Importing will overwrite them and cannot be undone. Continue?",
                kind.noun(),
                month_name(month),
            );
            if !confirm(&prompt) {
                return Ok(None);
            }
            overwrite_existing
        }
    };

    let result = match (kind, use_update_endpoint) {
        (RecordKind::Target, _) => api_client.upload_targets(year, month, file).await,
        (RecordKind::Collection, false) => api_client.upload_collections(year, month, file).await,
        (RecordKind::Collection, true) => {
            api_client.upload_update_collections(year, month, file).await
        }
    };

    match result {
        Ok(text) => Ok(Some(text)),
        Err(ApiError::Server(message)) => Err(refine_upload_error(expected_sheet(kind), &message)),
        Err(other) => Err(other.to_string()),
    }
}
