use shared::Branch;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::core::cascade::response_is_current;
use crate::services::api::ApiClient;

/// Branch list for the currently selected region, with a guard against the
/// region->branch cascade race: when the selection changes again before an
/// earlier fetch resolves, the stale response is discarded. Last selection
/// wins, never first response.
#[derive(Clone, PartialEq)]
pub struct UseBranchesResult {
    pub branches: UseStateHandle<Vec<Branch>>,
    pub loading: UseStateHandle<bool>,
    pub load_for_region: Callback<i64>,
    pub clear: Callback<()>,
}

#[hook]
pub fn use_branches(api_client: &ApiClient) -> UseBranchesResult {
    let branches = use_state(Vec::<Branch>::new);
    let loading = use_state(|| false);
    // The region whose branches we currently want; checked again when each
    // response lands.
    let wanted_region = use_mut_ref(|| Option::<i64>::None);

    let load_for_region = {
        let api_client = api_client.clone();
        let branches = branches.clone();
        let loading = loading.clone();
        let wanted_region = wanted_region.clone();

        Callback::from(move |region_id: i64| {
            *wanted_region.borrow_mut() = Some(region_id);
            branches.set(Vec::new());
            loading.set(true);

            let api_client = api_client.clone();
            let branches = branches.clone();
            let loading = loading.clone();
            let wanted_region = wanted_region.clone();

            spawn_local(async move {
                let result = api_client.branches_by_region(region_id).await;
                if !response_is_current(*wanted_region.borrow(), region_id) {
                    // A newer selection superseded this request.
                    return;
                }
                match result {
                    Ok(list) => branches.set(list),
                    Err(e) => {
                        gloo::console::error!("Failed to load branches:", e.to_string());
                        branches.set(Vec::new());
                    }
                }
                loading.set(false);
            });
        })
    };

    let clear = {
        let branches = branches.clone();
        let wanted_region = wanted_region.clone();
        Callback::from(move |_| {
            *wanted_region.borrow_mut() = None;
            branches.set(Vec::new());
        })
    };

    UseBranchesResult {
        branches,
        loading,
        load_for_region,
        clear,
    }
}
