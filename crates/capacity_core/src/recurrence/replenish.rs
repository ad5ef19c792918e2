//! Series replenishment planning.
//!
//! # Responsibility
//! - Group instances into series by signature.
//! - Decide, per series, which new dated instances close the gap between the
//!   latest materialized date and the horizon.
//!
//! # Invariants
//! - The anchor is the stored `series_anchor`, so rescheduling, pooling or
//!   renaming any member never shifts the interval phase. Legacy series
//!   without one fall back to their earliest scheduled date.
//! - Expansion always starts strictly after the latest member date, so a
//!   second run over `instances + planned` plans nothing.
//! - A series far behind the horizon only expands the last
//!   `MAX_EXPANSION_SPAN_DAYS` days and never gets stuck.
//! - One malformed series never blocks the others.

use crate::model::rule::SeriesSignature;
use crate::model::task::{now_epoch_ms, TaskId, TaskInstance};
use crate::recurrence::expand::{expand, ExpandError, MAX_EXPANSION_SPAN_DAYS};
use chrono::{Days, NaiveDate};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Why a series produced no new instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No member has a scheduled date, so there is no anchor.
    MissingAnchor,
    /// Every member is tombstoned; the series is retired.
    AllDeleted,
    /// Latest member date is already at or beyond the horizon.
    Satisfied,
    /// The rule occupies no date between the latest member and the horizon.
    NoQualifyingDates,
    /// The expander rejected the rule or range.
    InvalidExpansion(ExpandError),
}

impl SkipReason {
    /// Stable reason code for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingAnchor => "missing_anchor",
            Self::AllDeleted => "all_deleted",
            Self::Satisfied => "satisfied",
            Self::NoQualifyingDates => "no_qualifying_dates",
            Self::InvalidExpansion(_) => "invalid_expansion",
        }
    }

    /// Returns whether this skip points at malformed data or a caller bug.
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Self::MissingAnchor | Self::InvalidExpansion(_))
    }
}

/// New instances planned for one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesExtension {
    pub signature: SeriesSignature,
    /// Member the new instances were copied from.
    pub template_id: TaskId,
    pub anchor: NaiveDate,
    /// Latest member date before this extension.
    pub previous_last: NaiveDate,
    pub instances: Vec<TaskInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSeries {
    pub signature: SeriesSignature,
    pub reason: SkipReason,
}

/// Result of planning one replenishment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplenishPlan {
    pub extensions: Vec<SeriesExtension>,
    pub skipped: Vec<SkippedSeries>,
}

impl ReplenishPlan {
    /// Number of instances planned across all series.
    pub fn instance_count(&self) -> usize {
        self.extensions
            .iter()
            .map(|extension| extension.instances.len())
            .sum()
    }

    /// Flattens the plan into the new instances, series by series.
    pub fn into_instances(self) -> Vec<TaskInstance> {
        self.extensions
            .into_iter()
            .flat_map(|extension| extension.instances)
            .collect()
    }
}

/// Returns the instances that bring every series up to `horizon`.
///
/// Convenience over [`plan_replenishment`] stamping new instances with the
/// current time.
pub fn replenish(instances: &[TaskInstance], horizon: NaiveDate) -> Vec<TaskInstance> {
    plan_replenishment(instances, horizon, now_epoch_ms()).into_instances()
}

/// Plans one replenishment pass over `instances`.
///
/// One-off instances (no signature) are ignored. New instances are stamped
/// with `created_at`.
pub fn plan_replenishment(
    instances: &[TaskInstance],
    horizon: NaiveDate,
    created_at: i64,
) -> ReplenishPlan {
    let mut plan = ReplenishPlan::default();

    for (signature, members) in group_by_signature(instances) {
        match plan_series(&signature, &members, horizon, created_at) {
            Ok(extension) => {
                debug!(
                    "event=replenish_series module=recurrence status=ok signature={} anchor={} from={} planned={}",
                    signature,
                    extension.anchor,
                    extension.previous_last,
                    extension.instances.len()
                );
                plan.extensions.push(extension);
            }
            Err(reason) => {
                if reason.is_anomaly() {
                    warn!(
                        "event=replenish_series module=recurrence status=skip signature={} reason={}",
                        signature,
                        reason.as_str()
                    );
                } else {
                    debug!(
                        "event=replenish_series module=recurrence status=skip signature={} reason={}",
                        signature,
                        reason.as_str()
                    );
                }
                plan.skipped.push(SkippedSeries { signature, reason });
            }
        }
    }

    plan
}

/// Groups recurring instances by signature in deterministic order.
pub fn group_by_signature(
    instances: &[TaskInstance],
) -> BTreeMap<SeriesSignature, Vec<&TaskInstance>> {
    let mut groups: BTreeMap<SeriesSignature, Vec<&TaskInstance>> = BTreeMap::new();
    for instance in instances {
        if let Some(signature) = instance.signature() {
            groups.entry(signature).or_default().push(instance);
        }
    }
    groups
}

fn plan_series(
    signature: &str,
    members: &[&TaskInstance],
    horizon: NaiveDate,
    created_at: i64,
) -> Result<SeriesExtension, SkipReason> {
    if members.iter().all(|member| member.is_deleted) {
        return Err(SkipReason::AllDeleted);
    }

    // Earliest dated member; ties broken by creation time then id.
    let template = members
        .iter()
        .filter_map(|member| member.scheduled_date.map(|date| (date, *member)))
        .min_by_key(|(date, member)| (*date, member.created_at, member.id))
        .map(|(_, member)| member)
        .ok_or(SkipReason::MissingAnchor)?;
    let (Some(earliest), Some(rule)) = (template.scheduled_date, template.recurrence.as_ref())
    else {
        return Err(SkipReason::MissingAnchor);
    };
    let anchor = members
        .iter()
        .filter_map(|member| member.series_anchor)
        .min()
        .unwrap_or(earliest);

    let previous_last = members
        .iter()
        .filter_map(|member| member.scheduled_date)
        .max()
        .unwrap_or(earliest);
    if previous_last >= horizon {
        return Err(SkipReason::Satisfied);
    }

    let Some(next_day) = previous_last.checked_add_days(Days::new(1)) else {
        return Err(SkipReason::Satisfied);
    };
    let range_start = horizon
        .checked_sub_days(Days::new(MAX_EXPANSION_SPAN_DAYS.unsigned_abs()))
        .map_or(next_day, |floor| next_day.max(floor));
    let dates =
        expand(rule, anchor, range_start, horizon).map_err(SkipReason::InvalidExpansion)?;
    if dates.is_empty() {
        return Err(SkipReason::NoQualifyingDates);
    }

    Ok(SeriesExtension {
        signature: signature.to_string(),
        template_id: template.id,
        anchor,
        previous_last,
        instances: dates
            .into_iter()
            .map(|date| template.spawn_occurrence(date, created_at))
            .collect(),
    })
}
