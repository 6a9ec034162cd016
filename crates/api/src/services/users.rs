//! Profile reads and edits for the signed-in user, and the weekly
//! progress chart on the home screen.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use looks_lab_core::UserId;

use crate::db::{DomainRepository, RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::models::User;
use crate::models::user::UserUpdate;

const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayScore {
    pub day: &'static str,
    pub date: NaiveDate,
    pub score: f64,
}

/// Cumulative domain completion for each day of the current week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyProgress {
    pub user_id: UserId,
    pub labels: [&'static str; 7],
    pub scores: Vec<f64>,
    pub days: Vec<DayScore>,
    pub week_average: f64,
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Score Monday to Sunday of the week containing `today`.
///
/// A day's score is the share of all domain questions answered by the end
/// of that day, capped at 100. An empty question bank counts as one
/// question.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weekly_progress(
    user_id: UserId,
    today: NaiveDate,
    total_questions: i64,
    completed: &[DateTime<Utc>],
) -> WeeklyProgress {
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let total = total_questions.max(1) as f64;

    let days: Vec<DayScore> = DAY_LABELS
        .iter()
        .zip(0_i64..)
        .map(|(&day, offset)| {
            let date = monday + Duration::days(offset);
            let end_of_day = (date + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
            let answered = completed.iter().filter(|at| **at < end_of_day).count();
            DayScore {
                day,
                date,
                score: round_one(answered as f64 / total * 100.0).min(100.0),
            }
        })
        .collect();

    let scores: Vec<f64> = days.iter().map(|d| d.score).collect();
    let week_average = round_one(scores.iter().sum::<f64>() / scores.len() as f64);

    WeeklyProgress {
        user_id,
        labels: DAY_LABELS,
        scores,
        days,
        week_average,
    }
}

pub struct UserService<'a> {
    users: UserRepository<'a>,
    domains: DomainRepository<'a>,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            domains: DomainRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if either query fails.
    pub async fn weekly_progress(&self, id: UserId) -> Result<WeeklyProgress> {
        let total = self.domains.count_all_questions().await?;
        let completed = self.domains.completion_times(id).await?;
        let progress = weekly_progress(id, Utc::now().date_naive(), total, &completed);
        tracing::info!(
            user_id = %id,
            week_average = progress.week_average,
            "Calculated weekly progress"
        );
        Ok(progress)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user doesn't exist.
    pub async fn get(&self, id: UserId) -> Result<User> {
        self.users.get_by_id(id).await?.ok_or_else(user_not_found)
    }

    /// Apply a profile patch. An empty patch returns the user unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user doesn't exist.
    pub async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User> {
        if update.is_empty() {
            tracing::debug!(user_id = %id, "No profile changes");
            return self.get(id).await;
        }

        let user = self
            .users
            .update_profile(id, update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => user_not_found(),
                other => other.into(),
            })?;
        tracing::info!(user_id = %id, "Updated profile");
        Ok(user)
    }

    /// Delete the account and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user doesn't exist.
    pub async fn delete(&self, id: UserId) -> Result<()> {
        if !self.users.delete(id).await? {
            return Err(user_not_found());
        }
        tracing::info!(user_id = %id, "Deleted user");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_week_runs_monday_to_sunday() {
        // 2026-03-12 is a Thursday
        let today = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        let progress = weekly_progress(UserId::new(1), today, 10, &[]);

        assert_eq!(progress.labels, DAY_LABELS);
        assert_eq!(progress.days[0].date, NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert_eq!(progress.days[6].date, NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
        assert_eq!(progress.scores, vec![0.0; 7]);
        assert!((progress.week_average - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scores_are_cumulative() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        // One answer the week before, one Monday, one Wednesday night
        let completed = [at(2, 9), at(9, 8), at(11, 23)];
        let progress = weekly_progress(UserId::new(1), today, 3, &completed);

        assert_eq!(
            progress.scores,
            vec![66.7, 66.7, 100.0, 100.0, 100.0, 100.0, 100.0]
        );
        assert!((progress.week_average - 90.5).abs() < 1e-9);
    }

    #[test]
    fn test_scores_cap_at_full_and_survive_empty_bank() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let completed = [at(9, 1), at(9, 2)];
        let progress = weekly_progress(UserId::new(1), today, 0, &completed);

        assert!(progress.scores.iter().all(|s| (*s - 100.0).abs() < f64::EPSILON));
    }
}
