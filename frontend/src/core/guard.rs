use shared::Role;

/// Navigable views of the console. Admin-only routes live under the
/// `is_admin_only` prefix check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Targets,
    Collections,
    Analytics,
    AdminRegions,
    AdminBranches,
    AdminUsers,
}

impl Route {
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Route::AdminRegions | Route::AdminBranches | Route::AdminUsers
        )
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Register => "Register",
            Route::Dashboard => "Dashboard",
            Route::Targets => "Targets",
            Route::Collections => "Collections",
            Route::Analytics => "Analytics",
            Route::AdminRegions => "Regions",
            Route::AdminBranches => "Branches",
            Route::AdminUsers => "Users",
        }
    }
}

/// What decoded claims the guard consults. Detached from storage so the
/// decision function stays pure.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub logged_in: bool,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Allow,
    RedirectLogin,
    RedirectDashboard { notice: String },
}

/// Synchronous gate over already-decoded claims. This is a UI affordance
/// only; the backend re-validates every request.
pub fn check(route: Route, session: &SessionView) -> GuardDecision {
    if route.is_public() {
        return GuardDecision::Allow;
    }
    if !session.logged_in {
        return GuardDecision::RedirectLogin;
    }
    if route.is_admin_only() && session.role != Some(Role::Admin) {
        return GuardDecision::RedirectDashboard {
            notice: "You do not have admin access.".to_string(),
        };
    }
    GuardDecision::Allow
}

/// An admin must never demote or delete their own account from the console.
/// Equal usernames refuse the action before any network call.
pub fn may_modify_account(acting_username: &str, target_username: &str) -> bool {
    acting_username != target_username
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> SessionView {
        SessionView {
            logged_in: true,
            role: Some(Role::Admin),
        }
    }

    fn user() -> SessionView {
        SessionView {
            logged_in: true,
            role: Some(Role::User),
        }
    }

    fn anonymous() -> SessionView {
        SessionView {
            logged_in: false,
            role: None,
        }
    }

    #[test]
    fn anonymous_is_redirected_to_login() {
        assert_eq!(check(Route::Dashboard, &anonymous()), GuardDecision::RedirectLogin);
        assert_eq!(check(Route::Targets, &anonymous()), GuardDecision::RedirectLogin);
        assert_eq!(check(Route::AdminUsers, &anonymous()), GuardDecision::RedirectLogin);
    }

    #[test]
    fn login_and_register_are_always_reachable() {
        assert_eq!(check(Route::Login, &anonymous()), GuardDecision::Allow);
        assert_eq!(check(Route::Register, &anonymous()), GuardDecision::Allow);
        assert_eq!(check(Route::Login, &user()), GuardDecision::Allow);
    }

    #[test]
    fn admin_routes_deny_non_admins_with_notice() {
        for route in [Route::AdminRegions, Route::AdminBranches, Route::AdminUsers] {
            match check(route, &user()) {
                GuardDecision::RedirectDashboard { notice } => {
                    assert!(notice.contains("admin"));
                }
                other => panic!("expected redirect for {route:?}, got {other:?}"),
            }
            assert_eq!(check(route, &admin()), GuardDecision::Allow);
        }
    }

    #[test]
    fn regular_routes_allow_any_logged_in_role() {
        for route in [Route::Dashboard, Route::Targets, Route::Collections, Route::Analytics] {
            assert_eq!(check(route, &user()), GuardDecision::Allow);
            assert_eq!(check(route, &admin()), GuardDecision::Allow);
        }
    }

    #[test]
    fn self_modification_is_refused_for_any_target_role() {
        assert!(!may_modify_account("admin", "admin"));
        assert!(may_modify_account("admin", "colombo"));
    }
}
