use yew::prelude::*;

mod components;
mod core;
mod hooks;
mod services;

use crate::components::analytics_view::AnalyticsView;
use crate::components::branch_management::BranchManagement;
use crate::components::collection_management::CollectionManagement;
use crate::components::login::{LoginView, RegisterView};
use crate::components::region_management::RegionManagement;
use crate::components::target_management::TargetManagement;
use crate::components::users_admin::UsersAdmin;
use crate::core::guard::{self, GuardDecision, Route};
use crate::services::api::ApiClient;
use crate::services::session::Session;

#[function_component(App)]
fn app() -> Html {
    let route = use_state(|| {
        if Session::is_logged_in() {
            Route::Dashboard
        } else {
            Route::Login
        }
    });
    let banner = use_state(|| None::<String>);
    let api_client = use_memo((), |_| ApiClient::new());

    // Every navigation goes through the guard; denied routes land on the
    // fallback with an explanatory banner.
    let navigate = {
        let route = route.clone();
        let banner = banner.clone();
        Callback::from(move |target: Route| {
            match guard::check(target, &Session::view()) {
                GuardDecision::Allow => {
                    banner.set(None);
                    route.set(target);
                }
                GuardDecision::RedirectLogin => {
                    banner.set(Some("Please log in to continue".to_string()));
                    route.set(Route::Login);
                }
                GuardDecision::RedirectDashboard { notice } => {
                    banner.set(Some(notice));
                    route.set(Route::Dashboard);
                }
            }
        })
    };

    let on_login = {
        let route = route.clone();
        let banner = banner.clone();
        Callback::from(move |_: ()| {
            banner.set(None);
            route.set(Route::Dashboard);
        })
    };

    // Expired or rejected token: drop it and return to login.
    let on_unauthorized = {
        let route = route.clone();
        let banner = banner.clone();
        Callback::from(move |_: ()| {
            Session::logout();
            banner.set(Some("Session expired. Please log in again.".to_string()));
            route.set(Route::Login);
        })
    };

    let on_logout = {
        let route = route.clone();
        let banner = banner.clone();
        Callback::from(move |_: MouseEvent| {
            Session::logout();
            banner.set(None);
            route.set(Route::Login);
        })
    };

    let session = Session::view();
    let is_admin = session.role.map(|r| r.is_admin()).unwrap_or(false);

    let nav_link = |target: Route| {
        let navigate = navigate.clone();
        let active = *route == target;
        let onclick = Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            navigate.emit(target);
        });
        let class = if active { "nav-link active" } else { "nav-link" };
        html! {
            <a href="#" class={class} onclick={onclick}>{target.title()}</a>
        }
    };

    let view = match *route {
        Route::Login => html! {
            <LoginView
                api_client={(*api_client).clone()}
                on_login={on_login}
                on_navigate={navigate.clone()}
            />
        },
        Route::Register => html! {
            <RegisterView
                api_client={(*api_client).clone()}
                on_navigate={navigate.clone()}
            />
        },
        Route::Dashboard => {
            let username = Session::username();
            let branch = Session::branch_name();
            html! {
                <div class="dashboard">
                    <h2>{format!("Welcome, {username}")}</h2>
                    {if let Some(branch) = branch {
                        html! { <p>{format!("Branch: {branch}")}</p> }
                    } else {
                        html! { <p>{"Administrator console"}</p> }
                    }}
                    <p>{"Use the navigation above to record targets and collections, or open analytics for performance."}</p>
                </div>
            }
        }
        Route::Targets => html! {
            <TargetManagement
                api_client={(*api_client).clone()}
                on_unauthorized={on_unauthorized.clone()}
            />
        },
        Route::Collections => html! {
            <CollectionManagement
                api_client={(*api_client).clone()}
                on_unauthorized={on_unauthorized.clone()}
            />
        },
        Route::Analytics => html! {
            <AnalyticsView
                api_client={(*api_client).clone()}
                on_unauthorized={on_unauthorized.clone()}
            />
        },
        Route::AdminRegions => html! {
            <RegionManagement
                api_client={(*api_client).clone()}
                on_unauthorized={on_unauthorized.clone()}
            />
        },
        Route::AdminBranches => html! {
            <BranchManagement
                api_client={(*api_client).clone()}
                on_unauthorized={on_unauthorized.clone()}
            />
        },
        Route::AdminUsers => html! {
            <UsersAdmin
                api_client={(*api_client).clone()}
                on_unauthorized={on_unauthorized.clone()}
            />
        },
    };

    html! {
        <div class="app">
            <header class="app-header">
                <h1>{"Target Console"}</h1>
                {if session.logged_in {
                    html! {
                        <nav class="app-nav">
                            {nav_link(Route::Dashboard)}
                            {nav_link(Route::Targets)}
                            {nav_link(Route::Collections)}
                            {nav_link(Route::Analytics)}
                            {if is_admin {
                                html! {
                                    <>
                                        {nav_link(Route::AdminRegions)}
                                        {nav_link(Route::AdminBranches)}
                                        {nav_link(Route::AdminUsers)}
                                    </>
                                }
                            } else {
                                html! {}
                            }}
                            <a href="#" class="nav-link logout" onclick={on_logout}>{"Logout"}</a>
                        </nav>
                    }
                } else {
                    html! {}
                }}
            </header>
            {if let Some(text) = (*banner).clone() {
                html! { <div class="banner">{text}</div> }
            } else {
                html! {}
            }}
            <main class="app-main">
                {view}
            </main>
        </div>
    }
}

fn main() {
    yew::Renderer::<App>::new().render();
}
