use super::analytics::MonthBucket;

/// Sentinel value the month selector uses for "All Months".
pub const ALL_MONTHS: &str = "all";

/// Classification of the month filter: one concrete period, or the whole
/// year bucketed by month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSelection {
    Specific(u32),
    Aggregate,
}

impl PeriodSelection {
    /// Parse a raw selector value. Empty and the all-months sentinel map to
    /// Aggregate; anything that is not a month number 1-12 does too.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_MONTHS) {
            return PeriodSelection::Aggregate;
        }
        match trimmed.parse::<u32>() {
            Ok(month) if (1..=12).contains(&month) => PeriodSelection::Specific(month),
            _ => PeriodSelection::Aggregate,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, PeriodSelection::Aggregate)
    }

    pub fn month(&self) -> Option<u32> {
        match self {
            PeriodSelection::Specific(m) => Some(*m),
            PeriodSelection::Aggregate => None,
        }
    }
}

/// A trend chart applies only to the aggregate view, and only when at least
/// one bucket carries data. A specific month never renders a chart.
pub fn chart_visible(selection: PeriodSelection, buckets: &[MonthBucket]) -> bool {
    selection.is_aggregate()
        && buckets
            .iter()
            .any(|b| b.target != 0.0 || b.collection != 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(month: u32, target: f64, collection: f64) -> MonthBucket {
        MonthBucket {
            month,
            name: shared::month_name(month),
            target,
            collection,
            achievement_percent: 0,
        }
    }

    #[test]
    fn empty_and_sentinel_are_aggregate() {
        assert_eq!(PeriodSelection::parse(""), PeriodSelection::Aggregate);
        assert_eq!(PeriodSelection::parse("  "), PeriodSelection::Aggregate);
        assert_eq!(PeriodSelection::parse("all"), PeriodSelection::Aggregate);
        assert_eq!(PeriodSelection::parse("ALL"), PeriodSelection::Aggregate);
    }

    #[test]
    fn concrete_months_are_specific() {
        assert_eq!(PeriodSelection::parse("1"), PeriodSelection::Specific(1));
        assert_eq!(PeriodSelection::parse("12"), PeriodSelection::Specific(12));
    }

    #[test]
    fn out_of_range_falls_back_to_aggregate() {
        assert_eq!(PeriodSelection::parse("0"), PeriodSelection::Aggregate);
        assert_eq!(PeriodSelection::parse("13"), PeriodSelection::Aggregate);
        assert_eq!(PeriodSelection::parse("june"), PeriodSelection::Aggregate);
    }

    #[test]
    fn specific_month_never_shows_chart() {
        let buckets = vec![bucket(1, 100.0, 50.0)];
        assert!(!chart_visible(PeriodSelection::Specific(1), &buckets));
    }

    #[test]
    fn aggregate_chart_requires_data() {
        let empty: Vec<MonthBucket> = (1..=12).map(|m| bucket(m, 0.0, 0.0)).collect();
        assert!(!chart_visible(PeriodSelection::Aggregate, &empty));

        let mut some = empty.clone();
        some[5] = bucket(6, 100.0, 0.0);
        assert!(chart_visible(PeriodSelection::Aggregate, &some));
    }
}
