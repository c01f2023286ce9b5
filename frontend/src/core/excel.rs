use shared::ExistingCheck;

/// What the bulk-import flow should do before touching the network.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDecision {
    /// Precondition failed; no upload is issued.
    Refuse(String),
    /// Nothing exists for the period; upload straight away.
    Proceed,
    /// Records exist; overwrite is destructive and needs an explicit
    /// confirmation first.
    ConfirmOverwrite { existing: i64 },
}

/// Targets import: only gated on overwriting existing records.
pub fn plan_targets_import(existing_targets: ExistingCheck) -> ImportDecision {
    if existing_targets.exists {
        ImportDecision::ConfirmOverwrite {
            existing: existing_targets.count,
        }
    } else {
        ImportDecision::Proceed
    }
}

/// Collections import: refused outright when the period has no targets
/// (collections cannot precede targets), then gated on overwrite like
/// targets.
pub fn plan_collections_import(
    existing_targets: ExistingCheck,
    existing_collections: ExistingCheck,
) -> ImportDecision {
    if !existing_targets.exists {
        return ImportDecision::Refuse(
            "No targets exist for this period. Import targets before collections.".to_string(),
        );
    }
    if existing_collections.exists {
        ImportDecision::ConfirmOverwrite {
            existing: existing_collections.count,
        }
    } else {
        ImportDecision::Proceed
    }
}

/// Make the one known server failure readable: a workbook without the
/// expected sheet surfaces as a message containing both "sheet" and "null".
/// Everything else passes through verbatim.
pub fn refine_upload_error(expected_sheet: &str, raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("sheet") && lower.contains("null") {
        format!(
            "Upload failed: the workbook must contain a sheet named \"{expected_sheet}\". \
             Rename the worksheet and try again."
        )
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(count: i64) -> ExistingCheck {
        ExistingCheck {
            exists: count > 0,
            count,
        }
    }

    #[test]
    fn collections_import_refused_without_targets() {
        let decision = plan_collections_import(check(0), check(0));
        assert!(matches!(decision, ImportDecision::Refuse(_)));
        // Even when collections would not overwrite anything.
        let decision = plan_collections_import(check(0), check(3));
        assert!(matches!(decision, ImportDecision::Refuse(_)));
    }

    #[test]
    fn clean_period_proceeds_without_confirmation() {
        assert_eq!(plan_targets_import(check(0)), ImportDecision::Proceed);
        assert_eq!(plan_collections_import(check(5), check(0)), ImportDecision::Proceed);
    }

    #[test]
    fn existing_records_require_overwrite_confirmation() {
        assert_eq!(
            plan_targets_import(check(12)),
            ImportDecision::ConfirmOverwrite { existing: 12 }
        );
        assert_eq!(
            plan_collections_import(check(5), check(4)),
            ImportDecision::ConfirmOverwrite { existing: 4 }
        );
    }

    #[test]
    fn sheet_null_errors_get_a_clearer_message() {
        let refined = refine_upload_error(
            "collections",
            "Failed to upload collections: worksheet \"collections\" is NULL",
        );
        assert!(refined.contains("sheet named \"collections\""));

        let refined = refine_upload_error("targets", "Cannot invoke getRow because Sheet is null");
        assert!(refined.contains("sheet named \"targets\""));
    }

    #[test]
    fn other_errors_pass_through_verbatim() {
        let raw = "Failed to upload targets: branch UNKNOWN not found";
        assert_eq!(refine_upload_error("targets", raw), raw);
        // "sheet" alone is not enough.
        let raw = "spreadsheet too large";
        assert_eq!(refine_upload_error("targets", raw), raw);
    }
}
