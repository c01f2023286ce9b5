//! Create-or-update reconciliation for monthly target and collection
//! records.
//!
//! The flow is the same for both record kinds: once a (branch, year, month)
//! selection is complete, the exact-period record is fetched; NotFound means
//! a create, Found means an update that only administrators may perform.
//! The transitions live here as pure functions so the whole cycle is
//! testable without a browser; components own the async calls and feed the
//! results back in.

use shared::{month_name, Role};

/// Which record kind the flow is driving. Collections additionally require
/// a backing target for the period before anything can be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Target,
    Collection,
}

impl RecordKind {
    pub fn noun(&self) -> &'static str {
        match self {
            RecordKind::Target => "target",
            RecordKind::Collection => "collection",
        }
    }
}

/// The already-stored record for the selected period, as confirmed by the
/// server during the check step.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingRecord {
    pub id: i64,
    pub amount: f64,
}

/// Explicit flow state. One record's cycle:
/// Idle -> Checking -> CreateReady | UpdateReady -> Submitting
///      -> Idle (refresh) | Failed (revert for retry).
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertState {
    Idle,
    Checking,
    CreateReady,
    UpdateReady { existing: ExistingRecord },
    Submitting { prior: Box<UpsertState> },
    Failed { message: String, retry: Box<UpsertState> },
}

impl UpsertState {
    pub fn is_update_mode(&self) -> bool {
        matches!(self, UpsertState::UpdateReady { .. })
    }

    pub fn in_flight(&self) -> bool {
        matches!(self, UpsertState::Checking | UpsertState::Submitting { .. })
    }

    pub fn existing(&self) -> Option<&ExistingRecord> {
        match self {
            UpsertState::UpdateReady { existing } => Some(existing),
            _ => None,
        }
    }
}

/// What the amount input should do after a check resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountField {
    Clear,
    Prefill(f64),
}

/// Result of feeding a check response into the flow: the next state, the
/// input-field effect, and an error-styled notice when one applies.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub state: UpsertState,
    pub amount_field: AmountField,
    pub notice: Option<String>,
}

/// Entering the check step once the selection is complete.
pub fn begin_check() -> UpsertState {
    UpsertState::Checking
}

/// Resolve the existence check.
///
/// NotFound is the expected create path and never an error. Found forks by
/// role: an administrator gets a cleared input (enter the replacement value)
/// and no banner; anyone else gets the existing amount pre-filled plus a
/// notice that only an administrator may change it.
pub fn on_check_result(
    kind: RecordKind,
    role: Role,
    found: Option<ExistingRecord>,
    year: i32,
    month: u32,
) -> CheckOutcome {
    match found {
        None => CheckOutcome {
            state: UpsertState::CreateReady,
            amount_field: AmountField::Clear,
            notice: None,
        },
        Some(existing) => {
            if role.is_admin() {
                CheckOutcome {
                    state: UpsertState::UpdateReady { existing },
                    amount_field: AmountField::Clear,
                    notice: None,
                }
            } else {
                let notice = format!(
                    "A {} already exists for {} {}: {}. Only an administrator can change it.",
                    kind.noun(),
                    month_name(month),
                    year,
                    existing.amount,
                );
                CheckOutcome {
                    amount_field: AmountField::Prefill(existing.amount),
                    state: UpsertState::UpdateReady { existing },
                    notice: Some(notice),
                }
            }
        }
    }
}

/// The form's current values. `backing_target` is the target amount loaded
/// for the period and only matters for collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub branch_id: Option<i64>,
    pub year: i32,
    pub month: u32,
    pub amount: f64,
    pub backing_target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    BranchUnset,
    PeriodUnset,
    AmountNotPositive,
    NoBackingTarget,
}

impl DraftError {
    pub fn message(&self) -> &'static str {
        match self {
            DraftError::BranchUnset => "Please select a branch",
            DraftError::PeriodUnset => "Please select a year and month",
            DraftError::AmountNotPositive => "Please enter an amount greater than zero",
            DraftError::NoBackingTarget => {
                "No target exists for this period; a collection cannot be recorded without one"
            }
        }
    }
}

/// Client-side precondition check. A failing draft never reaches the
/// network.
pub fn validate_draft(kind: RecordKind, draft: &Draft) -> Result<(), DraftError> {
    if draft.branch_id.is_none() {
        return Err(DraftError::BranchUnset);
    }
    if draft.year <= 0 || !(1..=12).contains(&draft.month) {
        return Err(DraftError::PeriodUnset);
    }
    if draft.amount <= 0.0 {
        return Err(DraftError::AmountNotPositive);
    }
    if kind == RecordKind::Collection && !matches!(draft.backing_target, Some(t) if t > 0.0) {
        return Err(DraftError::NoBackingTarget);
    }
    Ok(())
}

/// Everything the update-confirmation prompt needs to summarize.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSummary {
    pub record_id: i64,
    pub branch_name: String,
    pub year: i32,
    pub month: u32,
    pub current_amount: f64,
    pub new_amount: f64,
}

impl UpdateSummary {
    pub fn prompt(&self, kind: RecordKind) -> String {
        format!(
            "Update {} for {}, {} {}?\nCurrent amount: {}\nNew amount: {}",
            kind.noun(),
            self.branch_name,
            month_name(self.month),
            self.year,
            self.current_amount,
            self.new_amount,
        )
    }
}

/// The decision `plan_submit` hands back to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitPlan {
    /// No network call; show the reason inline.
    Refuse(String),
    /// Issue the create directly, no confirmation.
    Create,
    /// Ask the user first; only an explicit confirm proceeds.
    ConfirmUpdate(UpdateSummary),
}

/// Decide what a submit click does, without performing it. Creates go
/// straight out; updates require the admin role and a confirmation; an
/// invalid draft or an in-flight request is refused outright.
pub fn plan_submit(
    kind: RecordKind,
    state: &UpsertState,
    role: Role,
    draft: &Draft,
    branch_name: &str,
) -> SubmitPlan {
    if let Err(err) = validate_draft(kind, draft) {
        return SubmitPlan::Refuse(err.message().to_string());
    }
    match state {
        UpsertState::CreateReady => SubmitPlan::Create,
        UpsertState::UpdateReady { existing } => {
            if !role.is_admin() {
                return SubmitPlan::Refuse(format!(
                    "Only administrators can update {}s",
                    kind.noun()
                ));
            }
            SubmitPlan::ConfirmUpdate(UpdateSummary {
                record_id: existing.id,
                branch_name: branch_name.to_string(),
                year: draft.year,
                month: draft.month,
                current_amount: existing.amount,
                new_amount: draft.amount,
            })
        }
        UpsertState::Failed { retry, .. } => {
            // Retry re-plans from the reverted state.
            plan_submit(kind, retry, role, draft, branch_name)
        }
        UpsertState::Idle | UpsertState::Checking | UpsertState::Submitting { .. } => {
            SubmitPlan::Refuse("Please wait for the current request to finish".to_string())
        }
    }
}

/// Transition into Submitting, remembering where to revert on failure.
pub fn begin_submit(state: &UpsertState) -> UpsertState {
    let prior = match state {
        UpsertState::Failed { retry, .. } => retry.clone(),
        other => Box::new(other.clone()),
    };
    UpsertState::Submitting { prior }
}

/// Declining the confirmation returns to UpdateReady unchanged.
pub fn on_confirm_declined(state: UpsertState) -> UpsertState {
    state
}

/// What the component must do after a submit resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Re-run the existence check so due/achievement come from the
    /// confirmed server record, not the optimistic local value.
    Refresh,
    /// Reverted to the pre-submit state; the user may retry without
    /// re-entering fields.
    Reverted { message: String },
}

pub fn on_submit_result(state: UpsertState, result: Result<(), String>) -> (UpsertState, SubmitOutcome) {
    let prior = match state {
        UpsertState::Submitting { prior } => prior,
        other => Box::new(other),
    };
    match result {
        Ok(()) => (UpsertState::Idle, SubmitOutcome::Refresh),
        Err(message) => (
            UpsertState::Failed {
                message: message.clone(),
                retry: prior,
            },
            SubmitOutcome::Reverted { message },
        ),
    }
}

/// Due is always target minus collection, computed fresh on every update.
pub fn due_amount(target: f64, collection: f64) -> f64 {
    target - collection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(amount: f64) -> Draft {
        Draft {
            branch_id: Some(7),
            year: 2025,
            month: 6,
            amount,
            backing_target: Some(1000.0),
        }
    }

    fn existing() -> ExistingRecord {
        ExistingRecord { id: 42, amount: 800.0 }
    }

    #[test]
    fn not_found_enters_create_ready_with_cleared_field() {
        let outcome = on_check_result(RecordKind::Target, Role::User, None, 2025, 6);
        assert_eq!(outcome.state, UpsertState::CreateReady);
        assert_eq!(outcome.amount_field, AmountField::Clear);
        assert!(outcome.notice.is_none());
    }

    #[test]
    fn found_forks_by_role() {
        let admin = on_check_result(RecordKind::Target, Role::Admin, Some(existing()), 2025, 6);
        assert!(admin.state.is_update_mode());
        assert_eq!(admin.amount_field, AmountField::Clear);
        assert!(admin.notice.is_none());

        let user = on_check_result(RecordKind::Target, Role::User, Some(existing()), 2025, 6);
        assert!(user.state.is_update_mode());
        assert_eq!(user.amount_field, AmountField::Prefill(800.0));
        let notice = user.notice.expect("non-admin gets a notice");
        assert!(notice.contains("June 2025"));
        assert!(notice.contains("administrator"));
    }

    #[test]
    fn check_is_idempotent_without_intervening_mutation() {
        let first = on_check_result(RecordKind::Collection, Role::User, Some(existing()), 2025, 3);
        let second = on_check_result(RecordKind::Collection, Role::User, Some(existing()), 2025, 3);
        assert_eq!(first, second);

        let a = on_check_result(RecordKind::Collection, Role::Admin, None, 2025, 3);
        let b = on_check_result(RecordKind::Collection, Role::Admin, None, 2025, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_drafts_are_refused_before_any_network_call() {
        let mut d = draft(500.0);
        d.branch_id = None;
        assert_eq!(validate_draft(RecordKind::Target, &d), Err(DraftError::BranchUnset));

        let mut d = draft(0.0);
        assert_eq!(
            validate_draft(RecordKind::Target, &d),
            Err(DraftError::AmountNotPositive)
        );
        d.amount = -5.0;
        assert_eq!(
            validate_draft(RecordKind::Target, &d),
            Err(DraftError::AmountNotPositive)
        );

        let mut d = draft(500.0);
        d.month = 0;
        assert_eq!(validate_draft(RecordKind::Target, &d), Err(DraftError::PeriodUnset));
    }

    #[test]
    fn collection_requires_backing_target() {
        let mut d = draft(500.0);
        d.backing_target = None;
        assert_eq!(
            validate_draft(RecordKind::Collection, &d),
            Err(DraftError::NoBackingTarget)
        );
        d.backing_target = Some(0.0);
        assert_eq!(
            validate_draft(RecordKind::Collection, &d),
            Err(DraftError::NoBackingTarget)
        );
        // Targets never need one.
        assert_eq!(validate_draft(RecordKind::Target, &d), Ok(()));
    }

    #[test]
    fn create_submits_without_confirmation() {
        let plan = plan_submit(
            RecordKind::Target,
            &UpsertState::CreateReady,
            Role::User,
            &draft(500.0),
            "COLOMBO",
        );
        assert_eq!(plan, SubmitPlan::Create);
    }

    #[test]
    fn admin_update_requires_confirmation_with_summary() {
        let state = UpsertState::UpdateReady { existing: existing() };
        let plan = plan_submit(RecordKind::Collection, &state, Role::Admin, &draft(950.0), "GALLE");
        match plan {
            SubmitPlan::ConfirmUpdate(summary) => {
                assert_eq!(summary.record_id, 42);
                assert_eq!(summary.branch_name, "GALLE");
                assert_eq!(summary.current_amount, 800.0);
                assert_eq!(summary.new_amount, 950.0);
                let prompt = summary.prompt(RecordKind::Collection);
                assert!(prompt.contains("GALLE"));
                assert!(prompt.contains("June 2025"));
            }
            other => panic!("expected ConfirmUpdate, got {other:?}"),
        }
    }

    #[test]
    fn non_admin_update_is_refused_even_with_a_valid_draft() {
        let state = UpsertState::UpdateReady { existing: existing() };
        let plan = plan_submit(RecordKind::Target, &state, Role::User, &draft(950.0), "GALLE");
        assert!(matches!(plan, SubmitPlan::Refuse(_)));
    }

    #[test]
    fn declined_confirmation_leaves_state_unchanged() {
        let state = UpsertState::UpdateReady { existing: existing() };
        assert_eq!(on_confirm_declined(state.clone()), state);
    }

    #[test]
    fn success_refreshes_and_failure_reverts() {
        let submitting = begin_submit(&UpsertState::CreateReady);
        let (state, outcome) = on_submit_result(submitting, Ok(()));
        assert_eq!(state, UpsertState::Idle);
        assert_eq!(outcome, SubmitOutcome::Refresh);

        let update = UpsertState::UpdateReady { existing: existing() };
        let submitting = begin_submit(&update);
        let (state, outcome) =
            on_submit_result(submitting, Err("period already recorded".to_string()));
        match &state {
            UpsertState::Failed { message, retry } => {
                assert_eq!(message, "period already recorded");
                assert_eq!(**retry, update);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(
            outcome,
            SubmitOutcome::Reverted {
                message: "period already recorded".to_string()
            }
        );

        // A retry from Failed plans exactly as the reverted state would.
        let plan = plan_submit(RecordKind::Target, &state, Role::Admin, &draft(950.0), "GALLE");
        assert!(matches!(plan, SubmitPlan::ConfirmUpdate(_)));
    }

    #[test]
    fn submit_refused_while_a_request_is_in_flight() {
        for state in [
            UpsertState::Idle,
            UpsertState::Checking,
            begin_submit(&UpsertState::CreateReady),
        ] {
            let plan = plan_submit(RecordKind::Target, &state, Role::Admin, &draft(1.0), "X");
            assert!(matches!(plan, SubmitPlan::Refuse(_)), "state {state:?}");
        }
    }

    #[test]
    fn due_is_target_minus_collection() {
        assert_eq!(due_amount(1000.0, 800.0), 200.0);
        assert_eq!(due_amount(500.0, 600.0), -100.0);
    }
}
