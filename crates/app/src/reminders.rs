use std::{collections::HashMap, time::Duration};

use chrono::NaiveDate;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use vaxtrack_core::NotificationKind;
use vaxtrack_storage::{
    Database, NewNotification, NotificationError, NotificationInsertOutcome, RecordError,
};

use crate::clock::{local_today, system_clock, Clock};

/// Background worker that refreshes stored statuses and raises reminders.
#[derive(Clone)]
pub struct ReminderWorker {
    database: Database,
    clock: Clock,
    interval: Duration,
}

/// Counters describing one reminder sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderReport {
    pub scanned: usize,
    pub status_updates: usize,
    pub created: usize,
    pub duplicates: usize,
    pub invalid_timezone: usize,
}

impl ReminderWorker {
    pub fn new(database: Database, interval: Duration) -> Self {
        Self {
            database,
            clock: system_clock(),
            interval,
        }
    }

    /// Overrides the clock used to resolve each owner's current day.
    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Runs the worker loop in the background.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run_loop().await;
        })
    }

    async fn run_loop(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                error!(stage = "reminders", error = %err, "reminder sweep failed");
            }
        }
    }

    /// Executes one sweep over every record still awaiting administration.
    pub async fn run_once(&self) -> Result<ReminderReport, ReminderError> {
        let start = std::time::Instant::now();
        let now = (self.clock)();
        let pending = self.database.records().list_pending().await?;

        let mut report = ReminderReport {
            scanned: pending.len(),
            ..ReminderReport::default()
        };
        let mut today_by_timezone: HashMap<String, Option<NaiveDate>> = HashMap::new();

        for entry in pending {
            let today = *today_by_timezone
                .entry(entry.owner_timezone.clone())
                .or_insert_with(|| match local_today(now, &entry.owner_timezone) {
                    Ok(today) => Some(today),
                    Err(err) => {
                        warn!(stage = "reminders", owner_id = %entry.owner_id, error = %err, "skipping owner with invalid timezone");
                        None
                    }
                });
            let Some(today) = today else {
                report.invalid_timezone += 1;
                continue;
            };

            let record = &entry.record;
            let status = record.status_on(today);
            if status != record.status
                && self
                    .database
                    .records()
                    .sync_status(&record.id, status, now)
                    .await?
            {
                report.status_updates += 1;
                counter!("record_status_sync_total", "status" => status.as_str()).increment(1);
            }

            let Some(kind) = NotificationKind::for_status(status) else {
                continue;
            };
            let outcome = self
                .database
                .notifications()
                .insert_if_absent(&NewNotification {
                    owner_id: &entry.owner_id,
                    record_id: &record.id,
                    kind,
                    created_at: now,
                })
                .await?;

            match outcome {
                NotificationInsertOutcome::Inserted => {
                    report.created += 1;
                    counter!("reminders_created_total", "kind" => kind.as_str()).increment(1);
                }
                NotificationInsertOutcome::Duplicate => report.duplicates += 1,
            }
        }

        histogram!("reminder_sweep_seconds").record(start.elapsed().as_secs_f64());
        info!(
            stage = "reminders",
            scanned = report.scanned,
            status_updates = report.status_updates,
            created = report.created,
            duplicates = report.duplicates,
            invalid_timezone = report.invalid_timezone,
            "reminder sweep completed"
        );

        Ok(report)
    }
}

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("failed to scan vaccination records: {0}")]
    Records(#[from] RecordError),
    #[error("failed to store reminder: {0}")]
    Notifications(#[from] NotificationError),
}
