use capacity_core::{
    compute_signature, RecurrenceRule, RuleValidationError, TaskInstance, TaskValidationError,
    WeekdaySet,
};
use chrono::NaiveDate;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn mon_wed() -> WeekdaySet {
    WeekdaySet::from_days(&[1, 3]).unwrap()
}

#[test]
fn one_off_task_has_no_signature() {
    assert_eq!(compute_signature("Water plants", None), None);
    assert_eq!(TaskInstance::new("Water plants").signature(), None);
}

#[test]
fn structurally_equal_inputs_share_a_signature() {
    let a = RecurrenceRule::weekly(1, WeekdaySet::from_days(&[3, 1]).unwrap());
    let b = RecurrenceRule::weekly(1, mon_wed());

    let sig_a = compute_signature("Standup", Some(&a)).unwrap();
    let sig_b = compute_signature("Standup", Some(&b)).unwrap();
    assert_eq!(sig_a, sig_b);
    assert_eq!(sig_a.len(), 64);
    assert!(sig_a.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn any_difference_in_title_or_rule_changes_the_signature() {
    let base = compute_signature("Standup", Some(&RecurrenceRule::daily(1))).unwrap();

    let variants = [
        compute_signature("Standup ", Some(&RecurrenceRule::daily(1))),
        compute_signature("standup", Some(&RecurrenceRule::daily(1))),
        compute_signature("Standup", Some(&RecurrenceRule::daily(2))),
        compute_signature("Standup", Some(&RecurrenceRule::weekly(1, mon_wed()))),
        compute_signature("Standup", Some(&RecurrenceRule::daily(1).until(date(2024, 6, 1)))),
    ];
    for variant in variants {
        assert_ne!(variant.unwrap(), base);
    }
}

#[test]
fn signature_is_stable_across_calls() {
    let rule = RecurrenceRule::weekly(2, mon_wed());
    let first = compute_signature("Review", Some(&rule));
    for _ in 0..3 {
        assert_eq!(compute_signature("Review", Some(&rule)), first);
    }
}

#[test]
fn signature_does_not_depend_on_instance_identity() {
    let rule = RecurrenceRule::daily(1);
    let mut a = TaskInstance::new("Stretch");
    a.recurrence = Some(rule.clone());
    a.series_id = Some(Uuid::new_v4());
    let mut b = TaskInstance::new("Stretch");
    b.recurrence = Some(rule);
    b.scheduled_date = Some(date(2024, 1, 1));

    assert_ne!(a.id, b.id);
    assert_eq!(a.signature(), b.signature());
}

#[test]
fn weekday_set_rejects_out_of_range_numbers() {
    assert_eq!(
        WeekdaySet::from_days(&[7]).unwrap_err(),
        RuleValidationError::WeekdayOutOfRange(7)
    );
    let set = WeekdaySet::from_days(&[6, 0, 6]).unwrap();
    assert_eq!(set.days().collect::<Vec<_>>(), vec![0, 6]);
    assert!(WeekdaySet::empty().is_empty());
}

#[test]
fn rule_serializes_with_frequency_tag() {
    let rule = RecurrenceRule::weekly(2, mon_wed()).until(date(2024, 12, 31));
    let json = serde_json::to_value(&rule).unwrap();
    assert_eq!(json["frequency"], "weekly");
    assert_eq!(json["interval"], 2);
    assert_eq!(json["days_of_week"], serde_json::json!([1, 3]));
    assert_eq!(json["end_date"], "2024-12-31");

    let decoded: RecurrenceRule = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, rule);
}

#[test]
fn rule_deserialization_defaults_interval_and_rejects_bad_weekdays() {
    let daily: RecurrenceRule = serde_json::from_value(serde_json::json!({
        "frequency": "daily"
    }))
    .unwrap();
    assert_eq!(daily, RecurrenceRule::daily(1));

    let weekly_without_days: RecurrenceRule = serde_json::from_value(serde_json::json!({
        "frequency": "weekly",
        "interval": 1
    }))
    .unwrap();
    assert_eq!(weekly_without_days, RecurrenceRule::weekly(1, WeekdaySet::empty()));

    let err = serde_json::from_value::<RecurrenceRule>(serde_json::json!({
        "frequency": "weekly",
        "days_of_week": [9]
    }))
    .unwrap_err();
    assert!(err.to_string().contains("out of range"), "unexpected error: {err}");
}

#[test]
fn task_validation_rejects_nil_id_blank_title_and_zero_interval() {
    assert_eq!(
        TaskInstance::with_id(Uuid::nil(), "x").unwrap_err(),
        TaskValidationError::NilId
    );

    let blank = TaskInstance::new("   ");
    assert_eq!(blank.validate().unwrap_err(), TaskValidationError::BlankTitle);

    let mut zero = TaskInstance::new("Zero");
    zero.recurrence = Some(RecurrenceRule::daily(0));
    assert_eq!(
        zero.validate().unwrap_err(),
        TaskValidationError::Rule(RuleValidationError::ZeroInterval)
    );
}

#[test]
fn task_serialization_uses_expected_wire_fields() {
    let id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
    let mut task = TaskInstance::with_id(id, "Write report").unwrap();
    task.created_at = 1_700_000_000_000;
    task.scheduled_date = Some(date(2024, 1, 3));
    task.estimated_minutes = Some(45);
    task.recurrence = Some(RecurrenceRule::daily(3));
    task.tags = vec!["desk".to_string()];

    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["scheduled_date"], "2024-01-03");
    assert_eq!(json["estimated_minutes"], 45);
    assert_eq!(json["recurrence"]["frequency"], "daily");
    assert_eq!(json["is_completed"], false);
    assert_eq!(json["is_deleted"], false);

    let decoded: TaskInstance = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, task);
}
