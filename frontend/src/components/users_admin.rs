use shared::{RegisterRequest, Role, UserAccount};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::confirm;
use crate::core::guard::may_modify_account;
use crate::services::api::ApiClient;
use crate::services::session::Session;

#[derive(Properties, PartialEq)]
pub struct UsersAdminProps {
    pub api_client: ApiClient,
    pub on_unauthorized: Callback<()>,
}

/// Admin user management: listing, role changes, deletion, and creating
/// additional administrators. Actions against the signed-in account are
/// refused locally, before any request goes out.
#[function_component(UsersAdmin)]
pub fn users_admin(props: &UsersAdminProps) -> Html {
    let acting_username = Session::username();

    let users = use_state(Vec::<UserAccount>::new);
    let notice = use_state(|| None::<(String, bool)>);
    let busy = use_state(|| false);
    let reload = use_state(|| 0u32);

    let new_name = use_state(String::new);
    let new_email = use_state(String::new);
    let new_username = use_state(String::new);
    let new_password = use_state(String::new);

    {
        let api_client = props.api_client.clone();
        let users = users.clone();
        let notice = notice.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        use_effect_with(*reload, move |_| {
            spawn_local(async move {
                match api_client.list_users().await {
                    Ok(list) => users.set(list),
                    Err(e) if e.is_unauthorized() => on_unauthorized.emit(()),
                    Err(e) => notice.set(Some((e.to_string(), false))),
                }
            });
            || ()
        });
    }

    let on_role_change = {
        let api_client = props.api_client.clone();
        let acting_username = acting_username.clone();
        let notice = notice.clone();
        let busy = busy.clone();
        let reload = reload.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        Callback::from(move |(user, role): (UserAccount, Role)| {
            if *busy || user.role == role {
                return;
            }
            if !may_modify_account(&acting_username, &user.username) {
                notice.set(Some((
                    "You cannot change your own role".to_string(),
                    false,
                )));
                return;
            }
            let api_client = api_client.clone();
            let notice = notice.clone();
            let busy = busy.clone();
            let reload = reload.clone();
            let on_unauthorized = on_unauthorized.clone();

            busy.set(true);
            spawn_local(async move {
                match api_client.update_user_role(user.id, role).await {
                    Ok(updated) => {
                        notice.set(Some((
                            format!("{} is now {}", updated.username, updated.role),
                            true,
                        )));
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

    let on_delete = {
        let api_client = props.api_client.clone();
        let acting_username = acting_username.clone();
        let notice = notice.clone();
        let busy = busy.clone();
        let reload = reload.clone();
        let on_unauthorized = props.on_unauthorized.clone();
        Callback::from(move |user: UserAccount| {
            if *busy {
                return;
            }
            if !may_modify_account(&acting_username, &user.username) {
                notice.set(Some((
                    "You cannot delete your own account".to_string(),
                    false,
                )));
                return;
            }
            if !confirm(&format!("Delete user {}?", user.username)) {
                return;
            }
            let api_client = api_client.clone();
            let notice = notice.clone();
            let busy = busy.clone();
            let reload = reload.clone();
            let on_unauthorized = on_unauthorized.clone();

            busy.set(true);
            spawn_local(async move {
                match api_client.delete_user(user.id).await {
                    Ok(()) => {
                        notice.set(Some((format!("User {} deleted", user.username), true)));
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

    let on_create_admin = {
        let api_client = props.api_client.clone();
        let new_name = new_name.clone();
        let new_email = new_email.clone();
        let new_username = new_username.clone();
        let new_password = new_password.clone();
        let notice = notice.clone();
        let busy = busy.clone();
        let reload = reload.clone();
        let on_unauthorized = props.on_unauthorized.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            let request = RegisterRequest {
                name: (*new_name).clone(),
                email: (*new_email).clone(),
                username: new_username.trim().to_string(),
                password: (*new_password).clone(),
            };
            if request.username.is_empty() || request.password.len() < 6 {
                notice.set(Some((
                    "Username is required and password must be at least 6 characters".to_string(),
                    false,
                )));
                return;
            }

            let api_client = api_client.clone();
            let new_name = new_name.clone();
            let new_email = new_email.clone();
            let new_username = new_username.clone();
            let new_password = new_password.clone();
            let notice = notice.clone();
            let busy = busy.clone();
            let reload = reload.clone();
            let on_unauthorized = on_unauthorized.clone();

            busy.set(true);
            spawn_local(async move {
                match api_client.create_admin(&request).await {
                    Ok(response) => match response.error {
                        Some(text) => notice.set(Some((text, false))),
                        None => {
                            notice.set(Some((
                                response
                                    .message
                                    .unwrap_or_else(|| "Administrator created".to_string()),
                                true,
                            )));
                            new_name.set(String::new());
                            new_email.set(String::new());
                            new_username.set(String::new());
                            new_password.set(String::new());
                            reload.set(*reload + 1);
                        }
                    },
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

    fn text_input(handle: &UseStateHandle<String>) -> Callback<InputEvent> {
        let handle = handle.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            handle.set(input.value());
        })
    }

    html! {
        <div class="management-view">
            <h2>{"Users"}</h2>
            {if let Some((text, success)) = (*notice).clone() {
                let class = if success { "form-message success" } else { "form-message error" };
                html! { <div class={class}>{text}</div> }
            } else {
                html! {}
            }}
            <table class="records-table">
                <thead>
                    <tr>
                        <th>{"Name"}</th>
                        <th>{"Email"}</th>
                        <th>{"Username"}</th>
                        <th>{"Role"}</th>
                        <th>{"Actions"}</th>
                    </tr>
                </thead>
                <tbody>
                    {for users.iter().cloned().map(|user| {
                        let is_self = user.username == acting_username;
                        let role_change = {
                            let on_role_change = on_role_change.clone();
                            let user = user.clone();
                            Callback::from(move |e: Event| {
                                let select: HtmlInputElement = e.target_unchecked_into();
                                let role = if select.value() == "ADMIN" {
                                    Role::Admin
                                } else {
                                    Role::User
                                };
                                on_role_change.emit((user.clone(), role));
                            })
                        };
                        let delete = {
                            let on_delete = on_delete.clone();
                            let user = user.clone();
                            Callback::from(move |_: MouseEvent| on_delete.emit(user.clone()))
                        };
                        html! {
                            <tr>
                                <td>{user.name.clone()}</td>
                                <td>{user.email.clone()}</td>
                                <td>
                                    {user.username.clone()}
                                    {if is_self { html! { <span class="self-tag">{" (you)"}</span> } } else { html! {} }}
                                </td>
                                <td>
                                    <select onchange={role_change} disabled={is_self || *busy}>
                                        <option value="USER" selected={user.role == Role::User}>{"USER"}</option>
                                        <option value="ADMIN" selected={user.role == Role::Admin}>{"ADMIN"}</option>
                                    </select>
                                </td>
                                <td>
                                    <button
                                        class="btn btn-small btn-danger"
                                        onclick={delete}
                                        disabled={is_self || *busy}
                                    >
                                        {"Delete"}
                                    </button>
                                </td>
                            </tr>
                        }
                    })}
                </tbody>
            </table>

            <form class="record-form" onsubmit={on_create_admin}>
                <h3>{"Create administrator"}</h3>
                <div class="form-row">
                    <label>{"Full name"}</label>
                    <input type="text" value={(*new_name).clone()} oninput={text_input(&new_name)} disabled={*busy} />
                </div>
                <div class="form-row">
                    <label>{"Email"}</label>
                    <input type="email" value={(*new_email).clone()} oninput={text_input(&new_email)} disabled={*busy} />
                </div>
                <div class="form-row">
                    <label>{"Username"}</label>
                    <input type="text" value={(*new_username).clone()} oninput={text_input(&new_username)} disabled={*busy} />
                </div>
                <div class="form-row">
                    <label>{"Password"}</label>
                    <input type="password" value={(*new_password).clone()} oninput={text_input(&new_password)} disabled={*busy} />
                </div>
                <button type="submit" class="btn btn-primary" disabled={*busy}>
                    {"Create admin"}
                </button>
            </form>
        </div>
    }
}
