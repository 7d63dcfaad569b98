use std::iter::Sum;
use std::ops::{Add, AddAssign};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{VaccinationRecord, VaccinationStatus};

/// Per-child progress counters. Computed on read, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildStats {
    pub total: u32,
    pub completed: u32,
    pub upcoming: u32,
    pub overdue: u32,
    /// Records carrying a clinic skip override; outside the other buckets.
    pub skipped: u32,
}

impl ChildStats {
    /// Reduces a child's records into counters as of `today`.
    pub fn from_records<'a, I>(records: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a VaccinationRecord>,
    {
        records
            .into_iter()
            .map(|record| record.status_on(today))
            .fold(Self::default(), |mut stats, status| {
                stats.record(status);
                stats
            })
    }

    /// Counts one derived status.
    pub fn record(&mut self, status: VaccinationStatus) {
        self.total += 1;
        match status {
            VaccinationStatus::Completed => self.completed += 1,
            VaccinationStatus::Overdue => self.overdue += 1,
            VaccinationStatus::Scheduled | VaccinationStatus::DueSoon => self.upcoming += 1,
            VaccinationStatus::Skipped => self.skipped += 1,
        }
    }

    /// Completed share in whole percent, `0` when there are no records.
    pub fn percent_complete(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        self.completed * 100 / self.total
    }
}

impl Add for ChildStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total: self.total + rhs.total,
            completed: self.completed + rhs.completed,
            upcoming: self.upcoming + rhs.upcoming,
            overdue: self.overdue + rhs.overdue,
            skipped: self.skipped + rhs.skipped,
        }
    }
}

impl AddAssign for ChildStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for ChildStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Top-level counters over every child of a parent or clinic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub children: u32,
    pub total: u32,
    pub completed: u32,
    pub upcoming: u32,
    pub overdue: u32,
    pub skipped: u32,
}

impl DashboardStats {
    /// Sums already computed per-child counters.
    pub fn from_child_stats<I>(children: I) -> Self
    where
        I: IntoIterator<Item = ChildStats>,
    {
        let mut count = 0;
        let sum: ChildStats = children
            .into_iter()
            .inspect(|_| count += 1)
            .sum();

        Self {
            children: count,
            total: sum.total,
            completed: sum.completed,
            upcoming: sum.upcoming,
            overdue: sum.overdue,
            skipped: sum.skipped,
        }
    }

    /// Computes dashboard totals from each child's full record list.
    pub fn from_children<'a, I>(children: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a [VaccinationRecord]>,
    {
        Self::from_child_stats(
            children
                .into_iter()
                .map(|records| ChildStats::from_records(records, today)),
        )
    }
}
