use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::{today_utc, Engine};
use crate::feed::FeedNormalizer;

/// Background task that completes past-due reservations on a fixed
/// interval. Owned by the service process, so it runs with no
/// dashboard session open.
pub async fn run_sweeper(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match engine.sweep_lifecycle(today_utc()).await {
            Ok(report) if report.completed > 0 => {
                info!(
                    completed = report.completed,
                    notified = report.notified,
                    "lifecycle sweep"
                );
            }
            Ok(_) => debug!("lifecycle sweep found nothing past due"),
            Err(e) => warn!("lifecycle sweep failed: {e}"),
        }
    }
}

/// Background task that pulls every registered feed and then derives
/// cleaning tasks for the imported checkouts. Both halves are
/// idempotent, so a failed round is simply retried on the next tick.
pub async fn run_feed_sync(engine: Arc<Engine>, normalizer: FeedNormalizer, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if let Err(e) = engine.sync_all_feeds(&normalizer).await {
            warn!("feed sync failed: {e}");
        }
        if let Err(e) = engine.sync_cleaning_tasks(today_utc()).await {
            warn!("cleaning-task sync failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InMemoryStore, Store};
    use crate::model::*;
    use chrono::Days;
    use ulid::Ulid;

    fn past_due_reservation(property_id: Ulid) -> Reservation {
        let check_out = today_utc() - Days::new(1);
        let check_in = check_out - Days::new(4);
        Reservation {
            id: Ulid::new(),
            property_id,
            guest_name: Some("Marta".into()),
            guest_email: None,
            guest_phone: None,
            check_in,
            check_out,
            nights: 4,
            total_amount: None,
            status: ReservationStatus::Confirmed,
            source: None,
            external_ref: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn sweeper_completes_past_checkouts() {
        let store = Arc::new(InMemoryStore::new());
        let pid = Ulid::new();
        store
            .insert_property(Property {
                id: pid,
                owner_id: Ulid::new(),
                name: "Villa Sol".into(),
                location: None,
                status: PropertyStatus::Active,
                commission_percentage: None,
            })
            .await
            .unwrap();
        let reservation = past_due_reservation(pid);
        let id = reservation.id;
        store.insert_reservation(reservation).await.unwrap();

        let engine = Arc::new(Engine::new(store.clone()));
        let handle = tokio::spawn(run_sweeper(engine, Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        let row = store.reservation(id).await.unwrap().unwrap();
        assert_eq!(row.status, ReservationStatus::Completed);
    }
}
