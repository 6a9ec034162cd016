//! Subscription types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use looks_lab_core::{PlanType, SubscriptionId, SubscriptionStatus, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan: PlanType,
    pub status: SubscriptionStatus,
    pub payment_id: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the subscription ran past its end date.
    #[must_use]
    pub fn is_past_end(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| end < now)
    }

    /// Status as the client should see it: any row past its end date reads
    /// as expired, whatever its stored status.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        if self.is_past_end(now) {
            SubscriptionStatus::Expired
        } else {
            self.status
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn subscription(status: SubscriptionStatus, end_date: Option<DateTime<Utc>>) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: SubscriptionId::new(1),
            user_id: UserId::new(1),
            plan: PlanType::Monthly,
            status,
            payment_id: None,
            start_date: now - Duration::days(40),
            end_date,
            trial_end: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_past_end_reads_expired() {
        let now = Utc::now();
        let sub = subscription(SubscriptionStatus::Active, Some(now - Duration::days(1)));
        assert!(sub.is_past_end(now));
        assert_eq!(sub.effective_status(now), SubscriptionStatus::Expired);
    }

    #[test]
    fn test_open_ended_active_stays_active() {
        let now = Utc::now();
        let sub = subscription(SubscriptionStatus::Active, None);
        assert!(!sub.is_past_end(now));
        assert_eq!(sub.effective_status(now), SubscriptionStatus::Active);
    }

    #[test]
    fn test_cancelled_past_end_reads_expired() {
        let now = Utc::now();
        let sub = subscription(SubscriptionStatus::Cancelled, Some(now - Duration::days(1)));
        assert_eq!(sub.effective_status(now), SubscriptionStatus::Expired);
    }

    #[test]
    fn test_cancelled_before_end_keeps_its_status() {
        let now = Utc::now();
        let sub = subscription(SubscriptionStatus::Cancelled, Some(now + Duration::days(3)));
        assert_eq!(sub.effective_status(now), SubscriptionStatus::Cancelled);
    }
}
