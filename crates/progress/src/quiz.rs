//! Daily quiz completion and streak.
//!
//! A streak survives one calendar day without a quiz: it is shown as long as
//! the last quiz was today or yesterday. A failed session resets it.

use std::sync::Arc;
use chrono::NaiveDate;
use defenders_storage::KeyValueStore;
use tracing::debug;
use crate::error::Result;

const LAST_QUIZ_DATE_KEY: &str = "lastQuizDate";
const STREAK_KEY: &str = "dailyStreak";
const COMPLETED_KEY_PREFIX: &str = "dailyQuizCompleted_";

/// Daily quiz bookkeeping.
pub struct DailyQuiz<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> DailyQuiz<S> {
    /// Create a quiz tracker.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Streak to show on `today`.
    pub async fn streak(&self, today: NaiveDate) -> Result<u32> {
        let last = self.last_quiz_date().await?;
        let active = match last {
            Some(d) => d == today || Some(d) == today.pred_opt(),
            None => false,
        };
        if !active {
            return Ok(0);
        }
        self.stored_streak().await
    }

    /// Whether the quiz for `today` has been finished.
    pub async fn is_completed(&self, today: NaiveDate) -> Result<bool> {
        Ok(self.store.get(&completed_key(today)).await?.is_some())
    }

    /// Record a finished session and return the new streak.
    pub async fn record_session(&self, today: NaiveDate, success: bool) -> Result<u32> {
        let shown = self.streak(today).await?;
        let last = self.last_quiz_date().await?;

        let streak = match (success, last == Some(today)) {
            (true, false) => shown + 1,
            (true, true) => shown,
            (false, _) => 0,
        };

        self.store.set(STREAK_KEY, &streak.to_string()).await?;
        self.store
            .set(LAST_QUIZ_DATE_KEY, &today.format("%Y-%m-%d").to_string())
            .await?;
        self.store.set(&completed_key(today), "true").await?;

        debug!(%today, success, streak, "daily quiz recorded");
        Ok(streak)
    }

    async fn last_quiz_date(&self) -> Result<Option<NaiveDate>> {
        Ok(self
            .store
            .get(LAST_QUIZ_DATE_KEY)
            .await?
            .and_then(|s| parse_quiz_date(&s)))
    }

    async fn stored_streak(&self) -> Result<u32> {
        Ok(self
            .store
            .get(STREAK_KEY)
            .await?
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0))
    }
}

fn completed_key(day: NaiveDate) -> String {
    format!("{}{}", COMPLETED_KEY_PREFIX, day.format("%Y-%m-%d"))
}

/// ISO dates, or the `Mon Jan 01 2024` form older clients stored.
fn parse_quiz_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%a %b %d %Y"))
        .ok()
}
