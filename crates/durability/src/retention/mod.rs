//! Tiered snapshot retention
//!
//! This module decides which snapshots survive pruning.
//!
//! # Policy Tiers
//!
//! Each tier is evaluated independently against "now" and the results are
//! unioned; a snapshot kept by any rule survives.
//!
//! - **Hourly**: everything younger than H hours
//! - **Daily**: one per UTC calendar day, for the last D days
//! - **Weekly**: one per ISO week, for the last W weeks
//! - **Monthly**: one per UTC calendar month, for the last M months
//! - **Newest**: the single most recent snapshot, always
//!
//! Windows are counted in whole buckets including the current one: with
//! D = 7 the daily tier covers today and the six previous days. The
//! representative of a bucket is the newest snapshot in it, because the
//! scan runs newest-first and the first snapshot to reach a bucket claims
//! it. All arithmetic is UTC.

mod prune;

pub use boardkeep_core::RetentionPolicy;
pub use prune::{PruneReport, Pruner};

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::snapshot::SnapshotEntry;

/// Why a snapshot is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepReason {
    /// Most recent snapshot overall
    Newest,
    /// Inside the hourly window
    Hourly,
    /// Representative of a calendar day
    Daily,
    /// Representative of an ISO week
    Weekly,
    /// Representative of a calendar month
    Monthly,
}

/// A snapshot that survives, with every rule that claimed it
#[derive(Debug, Clone)]
pub struct Retained {
    /// The snapshot
    pub entry: SnapshotEntry,
    /// Rules that keep it (never empty)
    pub reasons: Vec<KeepReason>,
}

/// Result of evaluating a policy over a set of snapshots
#[derive(Debug, Clone, Default)]
pub struct RetentionPlan {
    /// Survivors, newest first
    pub keep: Vec<Retained>,
    /// Snapshots no rule claims, newest first
    pub delete: Vec<SnapshotEntry>,
}

/// Evaluate `policy` over `entries` as of `now`.
///
/// Input order does not matter. Snapshots sharing a timestamp are ordered by
/// path so the plan is deterministic.
pub fn plan_retention(
    entries: &[SnapshotEntry],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionPlan {
    let mut sorted: Vec<&SnapshotEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.path.cmp(&a.path)));

    let today = now.date_naive();
    let this_week = week_start(today);
    let this_month = month_index(today);
    let hourly_window = Duration::hours(i64::from(policy.hourly_hours));

    let mut days: HashSet<NaiveDate> = HashSet::new();
    let mut weeks: HashSet<NaiveDate> = HashSet::new();
    let mut months: HashSet<i64> = HashSet::new();
    let mut plan = RetentionPlan::default();

    for (i, entry) in sorted.into_iter().enumerate() {
        let ts = entry.timestamp;
        let date = ts.date_naive();
        let mut reasons = Vec::new();

        if i == 0 {
            reasons.push(KeepReason::Newest);
        }
        if policy.hourly_hours > 0 && now.signed_duration_since(ts) < hourly_window {
            reasons.push(KeepReason::Hourly);
        }
        if policy.daily_days > 0
            && (today - date).num_days() < i64::from(policy.daily_days)
            && days.insert(date)
        {
            reasons.push(KeepReason::Daily);
        }
        let week = week_start(date);
        if policy.weekly_weeks > 0
            && (this_week - week).num_days() / 7 < i64::from(policy.weekly_weeks)
            && weeks.insert(week)
        {
            reasons.push(KeepReason::Weekly);
        }
        let month = month_index(date);
        if policy.monthly_months > 0
            && this_month - month < i64::from(policy.monthly_months)
            && months.insert(month)
        {
            reasons.push(KeepReason::Monthly);
        }

        if reasons.is_empty() {
            plan.delete.push(entry.clone());
        } else {
            plan.keep.push(Retained {
                entry: entry.clone(),
                reasons,
            });
        }
    }
    plan
}

/// Monday of the ISO week containing `date`
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Months since year 0, for whole-month distances
fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}
