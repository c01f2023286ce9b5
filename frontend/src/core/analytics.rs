use shared::{month_name, Collection};

/// Totals derived from a set of collection records. Never persisted;
/// recomputed fresh on every load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub target_total: f64,
    pub collection_total: f64,
    pub achievement_percent: u32,
}

/// One month of a yearly trend. All twelve are always emitted, zero-filled
/// for months with no records.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthBucket {
    pub month: u32,
    pub name: &'static str,
    pub target: f64,
    pub collection: f64,
    pub achievement_percent: u32,
}

/// Color-coding tier for an achievement percentage. Lower bounds are
/// inclusive: 100 is Excellent, 80 is Good, 60 is Moderate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementStatus {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl AchievementStatus {
    pub fn from_percent(percent: u32) -> Self {
        if percent >= 100 {
            AchievementStatus::Excellent
        } else if percent >= 80 {
            AchievementStatus::Good
        } else if percent >= 60 {
            AchievementStatus::Moderate
        } else {
            AchievementStatus::Poor
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            AchievementStatus::Excellent => "excellent",
            AchievementStatus::Good => "good",
            AchievementStatus::Moderate => "moderate",
            AchievementStatus::Poor => "poor",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AchievementStatus::Excellent => "Excellent",
            AchievementStatus::Good => "Good",
            AchievementStatus::Moderate => "Moderate",
            AchievementStatus::Poor => "Poor",
        }
    }
}

/// collection/target as a rounded percentage, 0 when the target is zero.
pub fn achievement_percent(target: f64, collection: f64) -> u32 {
    if target <= 0.0 {
        0
    } else {
        (collection / target * 100.0).round() as u32
    }
}

/// Fold period records into total target, total collection, and the derived
/// achievement percentage.
pub fn aggregate(records: &[Collection]) -> Totals {
    let target_total: f64 = records.iter().map(|r| r.target).sum();
    let collection_total: f64 = records.iter().map(|r| r.amount).sum();
    Totals {
        target_total,
        collection_total,
        achievement_percent: achievement_percent(target_total, collection_total),
    }
}

/// Bucket a year's records by month, in month order 1 through 12 regardless
/// of arrival order, applying the per-bucket achievement formula.
pub fn monthly_buckets(records: &[Collection]) -> Vec<MonthBucket> {
    let mut targets = [0.0f64; 12];
    let mut collections = [0.0f64; 12];
    for record in records {
        if (1..=12).contains(&record.month) {
            let idx = (record.month - 1) as usize;
            targets[idx] += record.target;
            collections[idx] += record.amount;
        }
    }
    (1..=12u32)
        .map(|month| {
            let idx = (month - 1) as usize;
            MonthBucket {
                month,
                name: month_name(month),
                target: targets[idx],
                collection: collections[idx],
                achievement_percent: achievement_percent(targets[idx], collections[idx]),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(month: u32, target: f64, amount: f64) -> Collection {
        Collection {
            id: 0,
            branch_id: 1,
            branch_name: "COLOMBO".into(),
            region_name: "WESTERN".into(),
            year: 2025,
            month,
            target,
            amount,
            due: target - amount,
            percentage: 0.0,
        }
    }

    #[test]
    fn zero_target_yields_zero_percent() {
        assert_eq!(achievement_percent(0.0, 500.0), 0);
        let totals = aggregate(&[record(1, 0.0, 500.0)]);
        assert_eq!(totals.achievement_percent, 0);
    }

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(achievement_percent(1000.0, 1000.0), 100);
        assert_eq!(achievement_percent(1000.0, 333.0), 33);
        assert_eq!(achievement_percent(1000.0, 335.0), 34);
    }

    #[test]
    fn status_tier_boundaries_are_inclusive() {
        assert_eq!(AchievementStatus::from_percent(100), AchievementStatus::Excellent);
        assert_eq!(AchievementStatus::from_percent(99), AchievementStatus::Good);
        assert_eq!(AchievementStatus::from_percent(80), AchievementStatus::Good);
        assert_eq!(AchievementStatus::from_percent(79), AchievementStatus::Moderate);
        assert_eq!(AchievementStatus::from_percent(60), AchievementStatus::Moderate);
        assert_eq!(AchievementStatus::from_percent(59), AchievementStatus::Poor);
        assert_eq!(AchievementStatus::from_percent(0), AchievementStatus::Poor);
    }

    #[test]
    fn buckets_cover_all_twelve_months_in_order() {
        let records = vec![
            record(3, 200.0, 180.0),
            record(1, 100.0, 90.0),
            record(1, 50.0, 10.0),
        ];
        let buckets = monthly_buckets(&records);
        assert_eq!(buckets.len(), 12);
        for (i, bucket) in buckets.iter().enumerate() {
            assert_eq!(bucket.month, i as u32 + 1);
        }
        assert_eq!(buckets[0].target, 150.0);
        assert_eq!(buckets[0].collection, 100.0);
        assert_eq!(buckets[0].achievement_percent, 67);
        assert_eq!(buckets[1].target, 0.0);
        assert_eq!(buckets[1].collection, 0.0);
        assert_eq!(buckets[1].achievement_percent, 0);
        assert_eq!(buckets[2].target, 200.0);
        assert_eq!(buckets[2].collection, 180.0);
        assert_eq!(buckets[2].achievement_percent, 90);
    }

    #[test]
    fn aggregate_sums_all_records() {
        let totals = aggregate(&[record(1, 100.0, 90.0), record(2, 300.0, 150.0)]);
        assert_eq!(totals.target_total, 400.0);
        assert_eq!(totals.collection_total, 240.0);
        assert_eq!(totals.achievement_percent, 60);
    }
}
