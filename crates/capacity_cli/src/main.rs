//! Planner maintenance entry point.
//!
//! # Responsibility
//! - Run the replenisher or a capacity check against a planner database.
//! - Keep output deterministic `key=value` lines for scripting.
//!
//! Usage:
//! - `capacity_cli` prints the core version and a health check.
//! - `capacity_cli <db-path> replenish [YYYY-MM-DD]`
//! - `capacity_cli <db-path> capacity <YYYY-MM-DD> <minutes>`
//!
//! Rolling file logs are written when `CAPACITY_LOG_DIR` names an absolute directory.

use capacity_core::db::open_db;
use capacity_core::{
    RecurrenceService, SettingsRepository, SqliteSettingsRepository, SqliteTaskRepository,
    TaskService,
};
use chrono::NaiveDate;
use std::error::Error;
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "CAPACITY_LOG_DIR";
const USAGE: &str = "usage: capacity_cli <db-path> replenish [YYYY-MM-DD]\n       capacity_cli <db-path> capacity <YYYY-MM-DD> <minutes>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        println!("capacity_core ping={}", capacity_core::ping());
        println!("capacity_core version={}", capacity_core::core_version());
        return ExitCode::SUCCESS;
    }

    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = capacity_core::init_logging(capacity_core::default_log_level(), &log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    let (db_path, command, rest) = match args {
        [db_path, command, rest @ ..] => (db_path, command.as_str(), rest),
        _ => return Err(USAGE.into()),
    };

    let conn = open_db(db_path)?;
    let settings = SqliteSettingsRepository::new(&conn).load_settings()?;

    match (command, rest) {
        ("replenish", rest) if rest.len() <= 1 => {
            let today = match rest.first() {
                Some(value) => parse_date(value)?,
                None => chrono::Local::now().date_naive(),
            };
            let service = RecurrenceService::new(SqliteTaskRepository::new(&conn));
            let report = service.replenish(today, settings.horizon_days)?;
            println!("horizon={}", report.horizon);
            println!("series_extended={}", report.series_extended);
            println!("instances_created={}", report.instances_created);
            println!("series_skipped={}", report.skipped.len());
            println!("series_failed={}", report.failed.len());
            for skipped in report.skipped.iter().filter(|s| s.reason.is_anomaly()) {
                println!("warning signature={} reason={}", skipped.signature, skipped.reason.as_str());
            }
            Ok(())
        }
        ("capacity", [date, minutes]) => {
            let date = parse_date(date)?;
            let minutes: u32 = minutes
                .parse()
                .map_err(|_| format!("invalid minutes `{minutes}`"))?;
            let service = TaskService::new(SqliteTaskRepository::new(&conn));
            let report = service.preview_capacity(date, minutes, settings.daily_capacity_minutes)?;
            println!("date={}", report.date);
            println!("budget_minutes={}", report.budget_minutes);
            println!("used_minutes={}", report.used_minutes);
            println!("open_minutes={}", report.open_minutes);
            println!("remaining_minutes={}", report.remaining_minutes);
            println!("projected_total={}", report.projected_total);
            println!("exceeds={}", report.exceeds);
            Ok(())
        }
        _ => Err(USAGE.into()),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date `{value}`; expected YYYY-MM-DD"))
}
