use shared::{month_name, Collection, Region, Role};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::trend_chart::TrendChart;
use crate::components::{current_year, year_range};
use crate::core::analytics::{aggregate, monthly_buckets, AchievementStatus};
use crate::core::period::{chart_visible, PeriodSelection, ALL_MONTHS};
use crate::hooks::use_branches::use_branches;
use crate::services::api::ApiClient;
use crate::services::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Region,
    Branch,
}

#[derive(Properties, PartialEq)]
pub struct AnalyticsViewProps {
    pub api_client: ApiClient,
    pub on_unauthorized: Callback<()>,
}

/// Performance dashboard over collections: totals, achievement tier, a
/// per-record table, and for whole-year selections a twelve-month trend
/// chart. Branch users see their own branch; administrators choose a
/// region or a branch.
#[function_component(AnalyticsView)]
pub fn analytics_view(props: &AnalyticsViewProps) -> Html {
    let role = Session::role().unwrap_or(Role::User);
    let own_branch = (!role.is_admin())
        .then(|| Session::branch_id().zip(Session::branch_name()))
        .flatten();

    let scope = use_state(|| {
        if own_branch.is_some() {
            Scope::Branch
        } else {
            Scope::Region
        }
    });
    let regions = use_state(Vec::<Region>::new);
    let selected_region = use_state(|| None::<i64>);
    let branches = use_branches(&props.api_client);
    let selected_branch = use_state(|| own_branch.as_ref().map(|(id, _)| *id));
    let year = use_state(current_year);
    let period = use_state(|| PeriodSelection::Aggregate);
    let rows = use_state(Vec::<Collection>::new);
    let loading = use_state(|| false);
    let error = use_state(|| None::<String>);
    let fetch_seq = use_mut_ref(|| 0u64);

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

    // Reload whenever the scope, subject, year, or period changes.
    {
        let api_client = props.api_client.clone();
        let rows = rows.clone();
        let loading = loading.clone();
        let error = error.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        let fetch_seq = fetch_seq.clone();
        let deps = (
            *scope,
            *selected_region,
            *selected_branch,
            *year,
            *period,
        );
        use_effect_with(deps, move |(scope, region_id, branch_id, year, period)| {
            let seq = {
                let mut guard = fetch_seq.borrow_mut();
                *guard += 1;
                *guard
            };
            let subject = match scope {
                Scope::Region => *region_id,
                Scope::Branch => *branch_id,
            };
            if let Some(subject) = subject {
                let scope = *scope;
                let year = *year;
                let period = *period;
                loading.set(true);
                error.set(None);
                spawn_local(async move {
                    let response = match (scope, period.month()) {
                        (Scope::Region, None) => {
                            api_client.collections_by_region_year(subject, year).await
                        }
                        (Scope::Region, Some(month)) => {
                            api_client
                                .collections_by_region_year_month(subject, year, month)
                                .await
                        }
                        (Scope::Branch, None) => {
                            api_client.collections_by_branch_year(subject, year).await
                        }
                        (Scope::Branch, Some(month)) => {
                            api_client
                                .collections_by_branch_year_month(subject, year, month)
                                .await
                        }
                    };
                    if *fetch_seq.borrow() != seq {
                        return;
                    }
                    loading.set(false);
                    match response {
                        Ok(list) => rows.set(list),
                        Err(e) if e.is_unauthorized() => {
                            on_unauthorized.emit(());
                        }
                        Err(e) => {
                            rows.set(Vec::new());
                            error.set(Some(e.to_string()));
                        }
                    }
                });
            } else {
                rows.set(Vec::new());
            }
            || ()
        });
    }

    let on_scope_change = {
        let scope = scope.clone();
        let selected_branch = selected_branch.clone();
        Callback::from(move |e: Event| {
            let select: HtmlInputElement = e.target_unchecked_into();
            match select.value().as_str() {
                "branch" => scope.set(Scope::Branch),
                _ => {
                    scope.set(Scope::Region);
                    selected_branch.set(None);
                }
            }
        })
    };

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

    let on_period_change = {
        let period = period.clone();
        Callback::from(move |e: Event| {
            let select: HtmlInputElement = e.target_unchecked_into();
            period.set(PeriodSelection::parse(&select.value()));
        })
    };

    let totals = aggregate(&rows);
    let status = AchievementStatus::from_percent(totals.achievement_percent);
    let buckets = monthly_buckets(&rows);
    let show_chart = chart_visible(*period, &buckets);

    html! {
        <div class="analytics-view">
            <h2>{"Performance analytics"}</h2>
            {if let Some(message) = (*error).clone() {
                html! { <div class="form-message error">{message}</div> }
            } else {
                html! {}
            }}
            <div class="filter-bar">
                {if role.is_admin() {
                    html! {
                        <>
                            <label>{"View"}</label>
                            <select onchange={on_scope_change}>
                                <option value="region" selected={*scope == Scope::Region}>{"By region"}</option>
                                <option value="branch" selected={*scope == Scope::Branch}>{"By branch"}</option>
                            </select>
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
                            {if *scope == Scope::Branch {
                                html! {
                                    <>
                                        <label>{"Branch"}</label>
                                        <select onchange={on_branch_change} disabled={*branches.loading}>
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
                                    </>
                                }
                            } else {
                                html! {}
                            }}
                        </>
                    }
                } else {
                    html! {
                        <span class="fixed-branch">
                            {own_branch.as_ref().map(|(_, name)| name.clone()).unwrap_or_default()}
                        </span>
                    }
                }}
                <label>{"Year"}</label>
                <select onchange={on_year_change}>
                    {for year_range().map(|y| html! {
                        <option value={y.to_string()} selected={y == *year}>{y}</option>
                    })}
                </select>
                <label>{"Month"}</label>
                <select onchange={on_period_change}>
                    <option value={ALL_MONTHS} selected={period.is_aggregate()}>{"All months"}</option>
                    {for (1..=12u32).map(|m| html! {
                        <option value={m.to_string()} selected={period.month() == Some(m)}>
                            {month_name(m)}
                        </option>
                    })}
                </select>
            </div>

            <div class="summary-cards">
                <div class="summary-card">
                    <span class="card-label">{"Total target"}</span>
                    <span class="card-value">{format!("{:.2}", totals.target_total)}</span>
                </div>
                <div class="summary-card">
                    <span class="card-label">{"Total collection"}</span>
                    <span class="card-value">{format!("{:.2}", totals.collection_total)}</span>
                </div>
                <div class="summary-card">
                    <span class="card-label">{"Achievement"}</span>
                    <span class={classes!("card-value", status.css_class())}>
                        {format!("{}% ({})", totals.achievement_percent, status.label())}
                    </span>
                </div>
            </div>

            {if show_chart {
                html! { <TrendChart buckets={buckets.clone()} /> }
            } else {
                html! {}
            }}

            {if *loading {
                html! { <p class="loading">{"Loading..."}</p> }
            } else if rows.is_empty() {
                html! { <p class="empty">{"No collections recorded for this selection"}</p> }
            } else {
                html! {
                    <table class="records-table">
                        <thead>
                            <tr>
                                <th>{"Branch"}</th>
                                <th>{"Region"}</th>
                                <th>{"Month"}</th>
                                <th>{"Target"}</th>
                                <th>{"Collection"}</th>
                                <th>{"Due"}</th>
                                <th>{"Achievement"}</th>
                            </tr>
                        </thead>
                        <tbody>
                            {for rows.iter().map(|row| {
                                let percent = row.percentage.round() as u32;
                                let row_status = AchievementStatus::from_percent(percent);
                                html! {
                                    <tr>
                                        <td>{row.branch_name.clone()}</td>
                                        <td>{row.region_name.clone()}</td>
                                        <td>{format!("{} {}", month_name(row.month), row.year)}</td>
                                        <td>{format!("{:.2}", row.target)}</td>
                                        <td>{format!("{:.2}", row.amount)}</td>
                                        <td>{format!("{:.2}", row.due)}</td>
                                        <td class={row_status.css_class()}>
                                            {format!("{percent}% ({})", row_status.label())}
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
