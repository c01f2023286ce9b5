use shared::{LoginRequest, RegisterRequest};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::core::guard::Route;
use crate::services::api::ApiClient;
use crate::services::session::Session;

#[derive(Properties, PartialEq)]
pub struct LoginProps {
    pub api_client: ApiClient,
    pub on_login: Callback<()>,
    pub on_navigate: Callback<Route>,
}

#[function_component(LoginView)]
pub fn login_view(props: &LoginProps) -> Html {
    let username = use_state(String::new);
    let password = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let on_username = {
        let username = username.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            username.set(input.value());
        })
    };

    let on_password = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            password.set(input.value());
        })
    };

    let on_submit = {
        let api_client = props.api_client.clone();
        let on_login = props.on_login.clone();
        let username = username.clone();
        let password = password.clone();
        let error = error.clone();
        let busy = busy.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            let request = LoginRequest {
                username: (*username).clone(),
                password: (*password).clone(),
            };
            if request.username.trim().is_empty() || request.password.is_empty() {
                error.set(Some("Username and password are required".to_string()));
                return;
            }

            let api_client = api_client.clone();
            let on_login = on_login.clone();
            let error = error.clone();
            let busy = busy.clone();

            busy.set(true);
            spawn_local(async move {
                match api_client.login(&request).await {
                    Ok(response) => match response.token {
                        Some(token) => {
                            Session::store_token(&token);
                            on_login.emit(());
                        }
                        None => {
                            let message = response
                                .error
                                .or(response.message)
                                .unwrap_or_else(|| "Invalid username or password".to_string());
                            error.set(Some(message));
                        }
                    },
                    Err(e) => error.set(Some(e.to_string())),
                }
                busy.set(false);
            });
        })
    };

    let go_register = {
        let on_navigate = props.on_navigate.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_navigate.emit(Route::Register);
        })
    };

    html! {
        <div class="auth-card">
            <h2>{"Sign in"}</h2>
            {if let Some(message) = (*error).clone() {
                html! { <div class="form-message error">{message}</div> }
            } else {
                html! {}
            }}
            <form onsubmit={on_submit}>
                <div class="form-row">
                    <label>{"Username"}</label>
                    <input
                        type="text"
                        value={(*username).clone()}
                        oninput={on_username}
                        disabled={*busy}
                    />
                </div>
                <div class="form-row">
                    <label>{"Password"}</label>
                    <input
                        type="password"
                        value={(*password).clone()}
                        oninput={on_password}
                        disabled={*busy}
                    />
                </div>
                <button type="submit" class="btn btn-primary" disabled={*busy}>
                    {if *busy { "Signing in..." } else { "Sign in" }}
                </button>
            </form>
            <p class="auth-switch">
                {"No account yet? "}
                <a href="#" onclick={go_register}>{"Register"}</a>
            </p>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct RegisterProps {
    pub api_client: ApiClient,
    pub on_navigate: Callback<Route>,
}

#[function_component(RegisterView)]
pub fn register_view(props: &RegisterProps) -> Html {
    let name = use_state(String::new);
    let email = use_state(String::new);
    let username = use_state(String::new);
    let password = use_state(String::new);
    let message = use_state(|| None::<(String, bool)>);
    let busy = use_state(|| false);

    fn text_input(handle: &UseStateHandle<String>) -> Callback<InputEvent> {
        let handle = handle.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            handle.set(input.value());
        })
    }

    let on_submit = {
        let api_client = props.api_client.clone();
        let name = name.clone();
        let email = email.clone();
        let username = username.clone();
        let password = password.clone();
        let message = message.clone();
        let busy = busy.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *busy {
                return;
            }
            let request = RegisterRequest {
                name: (*name).clone(),
                email: (*email).clone(),
                username: (*username).clone(),
                password: (*password).clone(),
            };
            if request.username.trim().is_empty() || request.password.len() < 6 {
                message.set(Some((
                    "Username is required and password must be at least 6 characters".to_string(),
                    false,
                )));
                return;
            }

            let api_client = api_client.clone();
            let message = message.clone();
            let busy = busy.clone();

            busy.set(true);
            spawn_local(async move {
                match api_client.register(&request).await {
                    Ok(response) => match response.error {
                        Some(text) => message.set(Some((text, false))),
                        None => {
                            let text = response
                                .message
                                .unwrap_or_else(|| "Account created".to_string());
                            message.set(Some((text, true)));
                        }
                    },
                    Err(e) => message.set(Some((e.to_string(), false))),
                }
                busy.set(false);
            });
        })
    };

    let go_login = {
        let on_navigate = props.on_navigate.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_navigate.emit(Route::Login);
        })
    };

    html! {
        <div class="auth-card">
            <h2>{"Register"}</h2>
            {if let Some((text, success)) = (*message).clone() {
                let class = if success { "form-message success" } else { "form-message error" };
                html! { <div class={class}>{text}</div> }
            } else {
                html! {}
            }}
            <form onsubmit={on_submit}>
                <div class="form-row">
                    <label>{"Full name"}</label>
                    <input type="text" value={(*name).clone()} oninput={text_input(&name)} disabled={*busy} />
                </div>
                <div class="form-row">
                    <label>{"Email"}</label>
                    <input type="email" value={(*email).clone()} oninput={text_input(&email)} disabled={*busy} />
                </div>
                <div class="form-row">
                    <label>{"Username"}</label>
                    <input type="text" value={(*username).clone()} oninput={text_input(&username)} disabled={*busy} />
                </div>
                <div class="form-row">
                    <label>{"Password"}</label>
                    <input type="password" value={(*password).clone()} oninput={text_input(&password)} disabled={*busy} />
                </div>
                <button type="submit" class="btn btn-primary" disabled={*busy}>
                    {if *busy { "Registering..." } else { "Register" }}
                </button>
            </form>
            <p class="auth-switch">
                {"Already registered? "}
                <a href="#" onclick={go_login}>{"Sign in"}</a>
            </p>
        </div>
    }
}
