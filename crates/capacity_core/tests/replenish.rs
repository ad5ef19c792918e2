use capacity_core::{
    days_between, expand, plan_replenishment, replenish, RecurrenceRule, SkipReason, Subtask,
    TaskInstance, TaskPatch, WeekdaySet, MAX_EXPANSION_SPAN_DAYS,
};
use chrono::{Days, NaiveDate};
use std::collections::HashSet;
use uuid::Uuid;

const CREATED_AT: i64 = 1_700_000_000_000;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn plus_days(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_add_days(Days::new(days)).unwrap()
}

fn series(title: &str, rule: &RecurrenceRule, dates: &[NaiveDate]) -> Vec<TaskInstance> {
    let series_id = Uuid::new_v4();
    dates
        .iter()
        .map(|day| {
            let mut task = TaskInstance::new(title);
            task.recurrence = Some(rule.clone());
            task.series_id = Some(series_id);
            task.scheduled_date = Some(*day);
            task
        })
        .collect()
}

fn latest_date(instances: &[TaskInstance], title: &str) -> Option<NaiveDate> {
    instances
        .iter()
        .filter(|task| task.title == title)
        .filter_map(|task| task.scheduled_date)
        .max()
}

#[test]
fn second_run_over_the_union_plans_nothing() {
    let daily = RecurrenceRule::daily(2);
    let weekly = RecurrenceRule::weekly(1, WeekdaySet::from_days(&[1, 4]).unwrap());
    let mut instances = series("Run", &daily, &[date(2024, 1, 1), date(2024, 1, 3)]);
    instances.extend(series("Review", &weekly, &[date(2024, 1, 1)]));
    let horizon = date(2024, 2, 15);

    let first = replenish(&instances, horizon);
    assert!(!first.is_empty());

    instances.extend(first);
    let second = replenish(&instances, horizon);
    assert!(second.is_empty());
}

#[test]
fn lagging_series_is_extended_from_its_first_anchor() {
    let rule = RecurrenceRule::daily(3);
    let anchor = date(2024, 1, 2);
    let today = date(2024, 3, 21);
    let latest = date(2024, 3, 16); // today - 5, off the rule's phase
    let instances = series("Inventory check", &rule, &[anchor, latest]);
    let horizon = plus_days(today, 30);

    let created = replenish(&instances, horizon);

    let dates: Vec<NaiveDate> = created.iter().filter_map(|t| t.scheduled_date).collect();
    assert_eq!(dates.first(), Some(&date(2024, 3, 17)));
    assert_eq!(dates.last(), Some(&date(2024, 4, 19)));
    assert_eq!(dates.len(), 12);
    for day in &dates {
        assert!(*day > latest && *day <= horizon);
        assert_eq!(days_between(anchor, *day).rem_euclid(3), 0);
    }
}

#[test]
fn daily_series_reaches_the_horizon_exactly() {
    let rule = RecurrenceRule::daily(1);
    let instances = series("Journal", &rule, &[date(2024, 1, 1)]);
    let horizon = date(2024, 1, 31);

    let created = replenish(&instances, horizon);

    assert_eq!(created.len(), 30);
    assert_eq!(latest_date(&created, "Journal"), Some(horizon));
}

#[test]
fn new_instances_copy_the_template_and_start_fresh() {
    let rule = RecurrenceRule::daily(1);
    let mut instances = series("Stretch", &rule, &[date(2024, 1, 1), date(2024, 1, 2)]);
    for task in &mut instances {
        task.estimated_minutes = Some(15);
        task.tags = vec!["health".to_string()];
        task.notes = Some("template notes".to_string());
    }
    instances[0].is_completed = true;
    let series_id = instances[0].series_id;

    let plan = plan_replenishment(&instances, date(2024, 1, 4), CREATED_AT);
    assert_eq!(plan.extensions.len(), 1);
    let extension = &plan.extensions[0];
    assert_eq!(extension.template_id, instances[0].id);
    assert_eq!(extension.anchor, date(2024, 1, 1));
    assert_eq!(extension.previous_last, date(2024, 1, 2));
    assert_eq!(Some(extension.signature.clone()), instances[0].signature());

    let existing_ids: HashSet<Uuid> = instances.iter().map(|t| t.id).collect();
    for task in &extension.instances {
        assert!(!existing_ids.contains(&task.id));
        assert_eq!(task.title, "Stretch");
        assert_eq!(task.estimated_minutes, Some(15));
        assert_eq!(task.tags, vec!["health".to_string()]);
        assert_eq!(task.recurrence, Some(rule.clone()));
        assert_eq!(task.series_id, series_id);
        assert_eq!(task.signature(), instances[0].signature());
        assert!(!task.is_completed);
        assert!(!task.is_deleted);
        assert_eq!(task.created_at, CREATED_AT);
        assert_eq!(task.notes, None);
        assert_eq!(task.project_id, None);
    }
}

#[test]
fn malformed_series_is_skipped_without_blocking_others() {
    let rule = RecurrenceRule::daily(1);
    let mut undated = TaskInstance::new("Someday");
    undated.recurrence = Some(rule.clone());

    let mut broken = TaskInstance::new("Broken");
    broken.recurrence = Some(RecurrenceRule::daily(0));
    broken.scheduled_date = Some(date(2024, 1, 1));

    let mut instances = vec![undated.clone(), broken.clone()];
    instances.extend(series("Healthy", &rule, &[date(2024, 1, 1)]));

    let plan = plan_replenishment(&instances, date(2024, 1, 5), CREATED_AT);

    assert_eq!(plan.extensions.len(), 1);
    assert_eq!(plan.instance_count(), 4);
    let reasons: Vec<(Option<String>, SkipReason)> = plan
        .skipped
        .iter()
        .map(|s| (Some(s.signature.clone()), s.reason.clone()))
        .collect();
    assert!(reasons.contains(&(undated.signature(), SkipReason::MissingAnchor)));
    assert!(reasons
        .iter()
        .any(|(sig, reason)| *sig == broken.signature()
            && matches!(reason, SkipReason::InvalidExpansion(_))));
}

#[test]
fn one_off_tasks_are_never_replenished() {
    let mut one_off = TaskInstance::new("Dentist");
    one_off.scheduled_date = Some(date(2024, 1, 1));

    let plan = plan_replenishment(&[one_off], date(2024, 3, 1), CREATED_AT);
    assert!(plan.extensions.is_empty());
    assert!(plan.skipped.is_empty());
}

#[test]
fn satisfied_and_empty_rule_series_are_skipped() {
    let satisfied = series("Ahead", &RecurrenceRule::daily(1), &[date(2024, 3, 1)]);
    let empty_weekly = series(
        "Never",
        &RecurrenceRule::weekly(1, WeekdaySet::empty()),
        &[date(2024, 1, 1)],
    );
    let mut instances = satisfied.clone();
    instances.extend(empty_weekly.clone());

    let plan = plan_replenishment(&instances, date(2024, 2, 1), CREATED_AT);

    assert!(plan.extensions.is_empty());
    let reason_for = |task: &TaskInstance| {
        plan.skipped
            .iter()
            .find(|s| Some(&s.signature) == task.signature().as_ref())
            .map(|s| s.reason.clone())
    };
    assert_eq!(reason_for(&satisfied[0]), Some(SkipReason::Satisfied));
    assert_eq!(reason_for(&empty_weekly[0]), Some(SkipReason::NoQualifyingDates));
}

#[test]
fn stopped_series_is_never_extended_again() {
    let rule = RecurrenceRule::daily(1);
    let mut instances = series("Old habit", &rule, &[date(2024, 1, 1), date(2024, 1, 2)]);
    let signature = instances[0].signature().unwrap();

    for task in &mut instances {
        task.apply_patch(&TaskPatch::detach_series());
    }

    for horizon in [date(2024, 1, 10), date(2024, 6, 1)] {
        let created = replenish(&instances, horizon);
        assert!(created
            .iter()
            .all(|task| task.signature().as_deref() != Some(signature.as_str())));
        assert!(created.is_empty());
    }
}

#[test]
fn deleted_members_count_toward_progress_but_a_fully_deleted_series_is_retired() {
    let rule = RecurrenceRule::daily(1);
    let mut instances = series(
        "Walk",
        &rule,
        &[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)],
    );
    instances[2].soft_delete();

    let created = replenish(&instances, date(2024, 1, 5));
    let dates: Vec<NaiveDate> = created.iter().filter_map(|t| t.scheduled_date).collect();
    assert_eq!(dates, vec![date(2024, 1, 4), date(2024, 1, 5)]);

    for task in &mut instances {
        task.soft_delete();
    }
    let plan = plan_replenishment(&instances, date(2024, 1, 5), CREATED_AT);
    assert!(plan.extensions.is_empty());
    assert_eq!(plan.skipped[0].reason, SkipReason::AllDeleted);
}

#[test]
fn daily_runs_do_not_drift_or_duplicate() {
    let rule = RecurrenceRule::weekly(2, WeekdaySet::from_days(&[2, 6]).unwrap());
    let anchor = date(2024, 1, 3); // a Wednesday
    let mut instances = series("Laundry", &rule, &[anchor]);
    let start_day = date(2024, 1, 3);

    let mut horizon = start_day;
    for run in 0..45 {
        let today = plus_days(start_day, run);
        horizon = plus_days(today, 30);
        let created = replenish(&instances, horizon);
        instances.extend(created);
    }

    let mut actual: Vec<NaiveDate> = instances.iter().filter_map(|t| t.scheduled_date).collect();
    actual.sort();
    let unique: HashSet<NaiveDate> = actual.iter().copied().collect();
    assert_eq!(unique.len(), actual.len());

    let mut expected = vec![anchor];
    expected.extend(
        expand(&rule, anchor, plus_days(anchor, 1), horizon)
            .unwrap()
            .into_iter(),
    );
    assert_eq!(actual, expected);
}

#[test]
fn stored_anchor_survives_moving_the_first_member() {
    let rule = RecurrenceRule::daily(3);
    let anchor = date(2024, 1, 1);
    // The Jan 1 member was rescheduled to Jan 2.
    let mut instances = series(
        "Plants",
        &rule,
        &[date(2024, 1, 2), date(2024, 1, 4), date(2024, 1, 7)],
    );
    for task in &mut instances {
        task.series_anchor = Some(anchor);
    }

    let plan = plan_replenishment(&instances, date(2024, 1, 16), CREATED_AT);

    assert_eq!(plan.extensions[0].anchor, anchor);
    let dates: Vec<NaiveDate> = plan
        .into_instances()
        .iter()
        .filter_map(|t| t.scheduled_date)
        .collect();
    assert_eq!(dates, vec![date(2024, 1, 10), date(2024, 1, 13), date(2024, 1, 16)]);
}

#[test]
fn new_members_inherit_anchor_and_an_unchecked_checklist() {
    let rule = RecurrenceRule::daily(1);
    let mut instances = series("Close shop", &rule, &[date(2024, 1, 1)]);
    instances[0].series_anchor = Some(date(2024, 1, 1));
    instances[0].subtasks = vec![Subtask::new("Till"), Subtask::new("Lights")];
    let till = instances[0].subtasks[0].id;
    instances[0].toggle_subtask(till);

    let created = replenish(&instances, date(2024, 1, 2));

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].series_anchor, Some(date(2024, 1, 1)));
    let titles: Vec<&str> = created[0].subtasks.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Till", "Lights"]);
    assert_eq!(created[0].subtask_progress(), (0, 2));
    assert!(created[0]
        .subtasks
        .iter()
        .all(|s| instances[0].subtasks.iter().all(|old| old.id != s.id)));
}

#[test]
fn long_dormant_series_catches_up_within_the_expansion_window() {
    let rule = RecurrenceRule::daily(7);
    let anchor = date(2000, 1, 3);
    let mut instances = series("Backup", &rule, &[anchor]);
    instances[0].series_anchor = Some(anchor);
    let horizon = date(2024, 6, 30);

    let plan = plan_replenishment(&instances, horizon, CREATED_AT);

    assert!(plan.skipped.is_empty());
    let dates: Vec<NaiveDate> = plan
        .into_instances()
        .iter()
        .filter_map(|t| t.scheduled_date)
        .collect();
    let window_start = horizon
        .checked_sub_days(Days::new(MAX_EXPANSION_SPAN_DAYS.unsigned_abs()))
        .unwrap();
    assert!(dates.first().is_some_and(|first| *first >= window_start));
    assert!(dates.last().is_some_and(|last| days_between(*last, horizon) < 7));
    for day in &dates {
        assert_eq!(days_between(anchor, *day).rem_euclid(7), 0);
    }

    let materialized: Vec<TaskInstance> = dates
        .iter()
        .map(|day| instances[0].spawn_occurrence(*day, CREATED_AT))
        .collect();
    instances.extend(materialized);
    assert!(replenish(&instances, horizon).is_empty());
}
