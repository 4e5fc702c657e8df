use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("progress amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("task {0:?} does not exist or is inactive")]
    UnknownTask(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Login,
    WatchTime,
    Community,
    Share,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::WatchTime => "watch_time",
            Self::Community => "community",
            Self::Share => "share",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "login" => Some(Self::Login),
            "watch_time" => Some(Self::WatchTime),
            "community" => Some(Self::Community),
            "share" => Some(Self::Share),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyTask {
    pub task_key: String,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub target_value: i64,
    pub reward_coins: i64,
}

/// A user's progress on one task for one UTC day.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskProgress {
    pub task_key: String,
    pub progress_value: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub task_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub progress: TaskProgress,
    /// True only for the update that crossed the target.
    pub newly_completed: bool,
    pub reward_coins: i64,
}

/// The task day a timestamp belongs to. Tasks reset at midnight UTC.
pub fn task_day(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

impl TaskProgress {
    pub fn empty(task_key: &str, task_date: NaiveDate) -> Self {
        Self {
            task_key: task_key.to_string(),
            progress_value: 0,
            is_completed: false,
            completed_at: None,
            task_date,
        }
    }

    /// Adds `amount` to the progress, clamped to the task target. Completed progress is
    /// never touched again, so a task can only pay out once per day.
    pub fn apply(&self, task: &DailyTask, amount: i64, now: DateTime<Utc>) -> Result<ProgressUpdate, TaskError> {
        if amount <= 0 {
            return Err(TaskError::InvalidAmount(amount));
        }
        if self.is_completed {
            return Ok(ProgressUpdate {
                progress: self.clone(),
                newly_completed: false,
                reward_coins: 0,
            });
        }

        let progress_value = self.progress_value.saturating_add(amount).min(task.target_value);
        let is_completed = progress_value >= task.target_value;
        let progress = TaskProgress {
            task_key: self.task_key.clone(),
            progress_value,
            is_completed,
            completed_at: is_completed.then_some(now),
            task_date: self.task_date,
        };

        Ok(ProgressUpdate {
            progress,
            newly_completed: is_completed,
            reward_coins: if is_completed { task.reward_coins } else { 0 },
        })
    }
}

pub fn progress_percentage(task: &DailyTask, progress: Option<&TaskProgress>) -> f64 {
    if task.target_value <= 0 {
        return 100.0;
    }
    let value = progress.map_or(0, |p| p.progress_value) as f64;
    (value / task.target_value as f64 * 100.0).min(100.0)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskWithProgress {
    #[serde(flatten)]
    pub task: DailyTask,
    pub progress: Option<TaskProgress>,
    pub progress_percentage: f64,
}

/// Joins the active tasks with whatever progress exists for the day.
pub fn with_progress(tasks: &[DailyTask], progress: &[TaskProgress]) -> Vec<TaskWithProgress> {
    tasks
        .iter()
        .map(|task| {
            let found = progress.iter().find(|p| p.task_key == task.task_key).cloned();
            TaskWithProgress {
                progress_percentage: progress_percentage(task, found.as_ref()),
                task: task.clone(),
                progress: found,
            }
        })
        .collect()
}

pub fn completed_count(tasks: &[DailyTask], progress: &[TaskProgress]) -> usize {
    tasks
        .iter()
        .filter(|task| {
            progress
                .iter()
                .any(|p| p.task_key == task.task_key && p.is_completed)
        })
        .count()
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "status", content = "remaining", rename_all = "snake_case")]
pub enum ClaimEligibility {
    Eligible,
    TasksRemaining(usize),
    AlreadyClaimed,
    NoTasks,
}

impl ClaimEligibility {
    /// A kitty key may be claimed once per day after every active task is completed.
    pub fn evaluate(tasks: &[DailyTask], progress: &[TaskProgress], already_claimed: bool) -> Self {
        if already_claimed {
            return Self::AlreadyClaimed;
        }
        if tasks.is_empty() {
            return Self::NoTasks;
        }
        match tasks.len() - completed_count(tasks, progress) {
            0 => Self::Eligible,
            remaining => Self::TasksRemaining(remaining),
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(key: &str, target: i64) -> DailyTask {
        DailyTask {
            task_key: key.to_string(),
            title: key.to_string(),
            description: None,
            task_type: TaskType::WatchTime,
            target_value: target,
            reward_coins: 20,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap()
    }

    #[test]
    fn test_progress_is_clamped_and_pays_once() {
        let watch = task("watch_30m", 1800);
        let start = TaskProgress::empty("watch_30m", task_day(now()));

        let first = start.apply(&watch, 1000, now()).unwrap();
        assert!(!first.newly_completed);
        assert_eq!(first.reward_coins, 0);
        assert_eq!(first.progress.progress_value, 1000);

        let second = first.progress.apply(&watch, 5000, now()).unwrap();
        assert!(second.newly_completed);
        assert_eq!(second.reward_coins, 20);
        assert_eq!(second.progress.progress_value, 1800);
        assert_eq!(second.progress.completed_at, Some(now()));

        let third = second.progress.apply(&watch, 10, now()).unwrap();
        assert!(!third.newly_completed);
        assert_eq!(third.reward_coins, 0);
        assert_eq!(third.progress, second.progress);
    }

    #[test]
    fn test_invalid_amount() {
        let start = TaskProgress::empty("x", task_day(now()));
        assert_eq!(start.apply(&task("x", 1), 0, now()), Err(TaskError::InvalidAmount(0)));
    }

    #[test]
    fn test_percentage() {
        let watch = task("w", 200);
        assert_eq!(progress_percentage(&watch, None), 0.0);
        let mut p = TaskProgress::empty("w", task_day(now()));
        p.progress_value = 50;
        assert_eq!(progress_percentage(&watch, Some(&p)), 25.0);
        p.progress_value = 500;
        assert_eq!(progress_percentage(&watch, Some(&p)), 100.0);
    }

    #[test]
    fn test_claim_eligibility() {
        let tasks = vec![task("a", 1), task("b", 1)];
        let day = task_day(now());
        let mut done_a = TaskProgress::empty("a", day);
        done_a.is_completed = true;

        assert_eq!(ClaimEligibility::evaluate(&[], &[], false), ClaimEligibility::NoTasks);
        assert_eq!(
            ClaimEligibility::evaluate(&tasks, &[done_a.clone()], false),
            ClaimEligibility::TasksRemaining(1)
        );

        let mut done_b = TaskProgress::empty("b", day);
        done_b.is_completed = true;
        let all = vec![done_a, done_b];
        assert!(ClaimEligibility::evaluate(&tasks, &all, false).is_eligible());
        assert_eq!(ClaimEligibility::evaluate(&tasks, &all, true), ClaimEligibility::AlreadyClaimed);
    }

    #[test]
    fn test_task_day_is_utc_date() {
        assert_eq!(task_day(now()), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }
}
