pub mod analytics_view;
pub mod branch_management;
pub mod collection_management;
pub mod excel_import;
pub mod login;
pub mod region_management;
pub mod target_management;
pub mod trend_chart;
pub mod users_admin;

/// Current calendar year from the browser clock.
pub fn current_year() -> i32 {
    js_sys::Date::new_0().get_full_year() as i32
}

/// Year choices offered by every period selector.
pub fn year_range() -> impl Iterator<Item = i32> {
    let now = current_year();
    (now - 5)..=(now + 5)
}

/// Native confirmation dialog; a missing window counts as a decline.
pub fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}
