use capacity_core::db::open_db_in_memory;
use capacity_core::{
    InMemoryTaskRepository, RecurrenceRule, RecurrenceService, RecurrenceServiceError,
    SkipReason, SqliteTaskRepository, TaskDraft, TaskInstance, TaskRepository, TaskService,
    WeekdaySet,
};
use chrono::NaiveDate;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn replenish_extends_series_in_sqlite_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::new(&conn);
    let tasks = TaskService::new(&repo);
    let created = tasks
        .create_series(
            TaskDraft::new("Gym").minutes(60),
            RecurrenceRule::weekly(1, WeekdaySet::from_days(&[1, 3, 5]).unwrap()),
            date(2024, 1, 1),
            date(2024, 1, 7),
        )
        .unwrap();
    assert_eq!(created.len(), 3);

    let service = RecurrenceService::new(&repo);
    let report = service.replenish(date(2024, 1, 1), 14).unwrap();
    assert_eq!(report.horizon, date(2024, 1, 15));
    assert_eq!(report.series_extended, 1);
    assert_eq!(report.instances_created, 4);
    assert!(report.failed.is_empty());

    let dates: Vec<NaiveDate> = repo
        .list_all()
        .unwrap()
        .into_iter()
        .filter_map(|task| task.scheduled_date)
        .collect();
    assert_eq!(
        dates,
        vec![
            date(2024, 1, 1),
            date(2024, 1, 3),
            date(2024, 1, 5),
            date(2024, 1, 8),
            date(2024, 1, 10),
            date(2024, 1, 12),
            date(2024, 1, 15),
        ]
    );

    let again = service.replenish(date(2024, 1, 1), 14).unwrap();
    assert_eq!(again.instances_created, 0);
    assert_eq!(again.skipped.len(), 1);
    assert_eq!(again.skipped[0].reason, SkipReason::Satisfied);
    assert_eq!(repo.list_all().unwrap().len(), 7);
}

#[test]
fn replenish_rejects_out_of_range_horizons() {
    let service = RecurrenceService::new(InMemoryTaskRepository::new());
    for days in [0, 367] {
        assert!(matches!(
            service.replenish(date(2024, 1, 1), days),
            Err(RecurrenceServiceError::InvalidHorizon(d)) if d == days
        ));
    }
}

#[test]
fn stop_series_detaches_members_and_prevents_replenishment() {
    let repo = InMemoryTaskRepository::new();
    let tasks = TaskService::new(&repo);
    let created = tasks
        .create_series(
            TaskDraft::new("Water plants"),
            RecurrenceRule::daily(2),
            date(2024, 1, 1),
            date(2024, 1, 9),
        )
        .unwrap();
    let signature = created[0].signature().unwrap();
    let service = RecurrenceService::new(&repo);

    assert_eq!(service.stop_series(&signature).unwrap(), 5);
    assert_eq!(service.stop_series(&signature).unwrap(), 0);

    let remaining = repo.list_all().unwrap();
    assert_eq!(remaining.len(), 5);
    assert!(remaining.iter().all(|task| task.recurrence.is_none()));
    assert!(remaining.iter().all(|task| !task.is_deleted));
    assert!(remaining
        .iter()
        .all(|task| task.series_id == created[0].series_id));

    let report = service.replenish(date(2024, 1, 9), 30).unwrap();
    assert_eq!(report.instances_created, 0);
    assert!(report.skipped.is_empty());
}

#[test]
fn stopping_one_series_leaves_same_titled_series_running() {
    let repo = InMemoryTaskRepository::new();
    let tasks = TaskService::new(&repo);
    let daily = tasks
        .create_series(
            TaskDraft::new("Practice"),
            RecurrenceRule::daily(1),
            date(2024, 1, 1),
            date(2024, 1, 2),
        )
        .unwrap();
    tasks
        .create_series(
            TaskDraft::new("Practice"),
            RecurrenceRule::weekly(1, WeekdaySet::from_days(&[6]).unwrap()),
            date(2024, 1, 1),
            date(2024, 1, 7),
        )
        .unwrap();

    let service = RecurrenceService::new(&repo);
    service
        .stop_series(&daily[0].signature().unwrap())
        .unwrap();

    let report = service.replenish(date(2024, 1, 7), 14).unwrap();
    assert_eq!(report.series_extended, 1);
    assert_eq!(report.instances_created, 2);
}

#[test]
fn unlink_container_clears_links_without_deleting() {
    let project_id = Uuid::new_v4();
    let mut linked = Vec::new();
    for order in 0..3 {
        let mut task = TaskInstance::new(format!("Step {order}"));
        task.project_id = Some(project_id);
        task.project_order = Some(order);
        linked.push(task);
    }
    let bystander = TaskInstance::new("Unrelated");
    let mut seed = linked.clone();
    seed.push(bystander.clone());
    let repo = InMemoryTaskRepository::from_tasks(seed).unwrap();
    let service = RecurrenceService::new(&repo);

    assert_eq!(service.unlink_container(project_id).unwrap(), 3);
    assert_eq!(service.unlink_container(project_id).unwrap(), 0);

    let all = repo.list_all().unwrap();
    assert_eq!(all.len(), 4);
    for task in &all {
        assert_eq!(task.project_id, None);
        assert_eq!(task.project_order, None);
        assert!(!task.is_deleted);
    }
    assert_eq!(repo.get_task(bystander.id).unwrap(), Some(bystander));
}

#[test]
fn rescheduling_the_first_member_keeps_the_biweekly_phase() {
    let repo = InMemoryTaskRepository::new();
    let tasks = TaskService::new(&repo);
    let created = tasks
        .create_series(
            TaskDraft::new("Review"),
            RecurrenceRule::weekly(2, WeekdaySet::from_days(&[1, 3]).unwrap()),
            date(2024, 1, 1),
            date(2024, 1, 20),
        )
        .unwrap();
    assert!(created
        .iter()
        .all(|task| task.series_anchor == Some(date(2024, 1, 1))));

    tasks.reschedule(created[0].id, date(2024, 1, 2)).unwrap();
    let report = RecurrenceService::new(&repo)
        .replenish(date(2024, 1, 10), 30)
        .unwrap();

    assert_eq!(report.instances_created, 2);
    let mut dates: Vec<NaiveDate> = repo
        .list_all()
        .unwrap()
        .into_iter()
        .filter_map(|task| task.scheduled_date)
        .collect();
    dates.sort();
    assert_eq!(
        dates,
        vec![
            date(2024, 1, 2),
            date(2024, 1, 3),
            date(2024, 1, 15),
            date(2024, 1, 17),
            date(2024, 1, 29),
            date(2024, 1, 31),
        ]
    );
}

#[test]
fn pooling_or_renaming_the_first_member_keeps_the_phase() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::new(&conn);
    let tasks = TaskService::new(&repo);
    let created = tasks
        .create_series(
            TaskDraft::new("Bins"),
            RecurrenceRule::daily(4),
            date(2024, 1, 1),
            date(2024, 1, 9),
        )
        .unwrap();
    assert_eq!(created.len(), 3);

    tasks.move_to_pool(created[0].id).unwrap();
    let renamed = tasks.rename(created[1].id, "Recycling").unwrap();
    tasks.reschedule(created[2].id, date(2024, 1, 10)).unwrap();
    let report = RecurrenceService::new(&repo)
        .replenish(date(2024, 1, 9), 9)
        .unwrap();

    // New dates still follow Jan 1 + 4k in both series.
    let dates_of = |signature: String| -> Vec<NaiveDate> {
        repo.list_by_signature(&signature)
            .unwrap()
            .into_iter()
            .filter_map(|task| task.scheduled_date)
            .collect()
    };
    assert_eq!(
        dates_of(created[2].signature().unwrap()),
        vec![date(2024, 1, 10), date(2024, 1, 13), date(2024, 1, 17)]
    );
    assert_eq!(
        dates_of(renamed.signature().unwrap()),
        vec![date(2024, 1, 5), date(2024, 1, 9), date(2024, 1, 13), date(2024, 1, 17)]
    );
    assert_eq!(report.series_extended, 2);
}
