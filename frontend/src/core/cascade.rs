//! Region -> branch cascade: deciding whether an in-flight branch-list
//! response still matches the user's current region selection.

/// A branch-list response is applied only when the region it answers for is
/// still the one the user wants. Last selection wins, never first response.
pub fn response_is_current(wanted: Option<i64>, responded: i64) -> bool {
    wanted == Some(responded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_selection_is_applied() {
        assert!(response_is_current(Some(3), 3));
    }

    #[test]
    fn cleared_selection_discards_responses() {
        assert!(!response_is_current(None, 3));
    }

    #[test]
    fn later_selection_wins_over_earlier_response() {
        // User picks region 1, then re-picks region 2 before the first
        // fetch resolves.
        let mut wanted = Some(1);
        assert!(response_is_current(wanted, 1));
        wanted = Some(2);

        // Region 1's response arrives late and must be discarded; region 2's
        // is applied whenever it lands.
        assert!(!response_is_current(wanted, 1));
        assert!(response_is_current(wanted, 2));
    }
}
