use tracing::{info, warn};
use ulid::Ulid;

use crate::feed::{FeedEvent, FeedNormalizer, FeedSource};
use crate::limits::*;
use crate::model::*;
use crate::notify;
use crate::observability;

use super::conflict::{check_no_conflict, find_conflicts, validate_stay};
use super::queries::OCCUPYING;
use super::{Engine, EngineError};

impl Engine {
    /// Validate, conflict-check and persist a manually entered stay.
    ///
    /// Nothing is written when validation or the conflict check fails;
    /// a conflict is reported with the colliding reservation ids.
    pub async fn create_reservation(
        &self,
        property_id: Ulid,
        stay: Stay,
        details: NewReservation,
    ) -> Result<Reservation, EngineError> {
        validate_stay(&stay)?;
        if let Some(ref name) = details.guest_name
            && name.len() > MAX_NAME_LEN {
                return Err(EngineError::LimitExceeded("guest name too long"));
            }
        if let Some(ref notes) = details.notes
            && notes.len() > MAX_NOTES_LEN {
                return Err(EngineError::LimitExceeded("notes too long"));
            }
        self.store
            .property(property_id)
            .await?
            .ok_or(EngineError::NotFound(property_id))?;

        let existing = self
            .store
            .reservations_for_property(property_id, &OCCUPYING)
            .await?;
        if let Err(e) = check_no_conflict(&stay, &existing) {
            metrics::counter!(observability::CONFLICTS_DETECTED_TOTAL).increment(1);
            return Err(e);
        }

        let reservation = Reservation {
            id: Ulid::new(),
            property_id,
            guest_name: details.guest_name,
            guest_email: details.guest_email,
            guest_phone: details.guest_phone,
            check_in: stay.check_in,
            check_out: stay.check_out,
            nights: stay.nights(),
            total_amount: details.total_amount,
            status: ReservationStatus::Confirmed,
            source: details.source,
            external_ref: details.external_ref,
            notes: details.notes,
        };
        self.store.insert_reservation(reservation.clone()).await?;
        metrics::counter!(observability::RESERVATIONS_CREATED_TOTAL).increment(1);
        info!(reservation = %reservation.id, property = %property_id, "reservation created");
        Ok(reservation)
    }

    /// Cancellation is a status flip, never a physical delete.
    pub async fn cancel_reservation(&self, id: Ulid) -> Result<(), EngineError> {
        let reservation = self
            .store
            .reservation(id)
            .await?
            .ok_or(EngineError::NotFound(id))?;
        self.store
            .set_reservation_status(&[reservation.id], ReservationStatus::Cancelled)
            .await?;
        info!(reservation = %id, "reservation cancelled");
        Ok(())
    }

    /// Persist normalized feed events as reservations for a property.
    ///
    /// Per-item: an event already imported (matching external UID, or an
    /// identical stay from the same source), one that collapses to zero
    /// nights, or one colliding with existing occupancy is skipped; a
    /// failing insert is logged and the loop continues. Returns the
    /// number of rows written.
    pub async fn import_feed_events(
        &self,
        property_id: Ulid,
        events: &[FeedEvent],
    ) -> Result<u32, EngineError> {
        self.store
            .property(property_id)
            .await?
            .ok_or(EngineError::NotFound(property_id))?;

        let mut imported = 0u32;
        for event in events {
            match self.import_one_event(property_id, event).await {
                Ok(true) => imported += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(source = %event.source, "feed event skipped: {e}");
                }
            }
        }
        if imported > 0 {
            metrics::counter!(observability::RESERVATIONS_IMPORTED_TOTAL)
                .increment(imported as u64);
        }
        Ok(imported)
    }

    async fn import_one_event(
        &self,
        property_id: Ulid,
        event: &FeedEvent,
    ) -> Result<bool, EngineError> {
        let check_in = event.start.date_naive();
        let check_out = event.end.date_naive();
        if check_out <= check_in {
            // Zero-night artifacts (same-day markers) carry no occupancy.
            return Ok(false);
        }
        let stay = Stay::new(check_in, check_out);

        if let Some(ref uid) = event.uid
            && self
                .store
                .reservation_by_external_ref(property_id, uid)
                .await?
                .is_some()
        {
            return Ok(false);
        }

        let existing = self
            .store
            .reservations_for_property(property_id, &OCCUPYING)
            .await?;
        let duplicate = existing.iter().any(|r| {
            r.check_in == check_in
                && r.check_out == check_out
                && r.source.as_deref() == Some(event.source.as_str())
        });
        if duplicate {
            return Ok(false);
        }
        if !find_conflicts(&stay, &existing).is_empty() {
            warn!(
                source = %event.source,
                %check_in,
                %check_out,
                "feed event overlaps existing occupancy, skipped"
            );
            return Ok(false);
        }

        let reservation = Reservation {
            id: Ulid::new(),
            property_id,
            guest_name: None,
            guest_email: None,
            guest_phone: None,
            check_in,
            check_out,
            nights: stay.nights(),
            total_amount: None,
            status: ReservationStatus::Confirmed,
            source: Some(event.source.clone()),
            external_ref: event.uid.clone(),
            notes: Some(event.title.clone()),
        };
        self.store.insert_reservation(reservation).await?;
        Ok(true)
    }

    /// Fetch every active registered feed and import what it yields.
    /// A feed that fails to fetch or import is skipped, not fatal.
    pub async fn sync_all_feeds(
        &self,
        normalizer: &FeedNormalizer,
    ) -> Result<u32, EngineError> {
        let feeds = self.store.active_feeds().await?;
        if feeds.len() > MAX_FEEDS_PER_SYNC {
            return Err(EngineError::LimitExceeded("too many feeds in one sync"));
        }

        let mut imported = 0u32;
        for feed in &feeds {
            let sources = [FeedSource {
                url: feed.ical_url.clone(),
                label: feed.platform.clone(),
            }];
            let events = normalizer.fetch_all(&sources).await;
            match self.import_feed_events(feed.property_id, &events).await {
                Ok(count) => imported += count,
                Err(e) => {
                    warn!(feed = %feed.id, property = %feed.property_id, "feed import failed: {e}");
                }
            }
        }
        if !feeds.is_empty() {
            info!(feeds = feeds.len(), imported, "feed sync finished");
        }
        Ok(imported)
    }

    /// Create missing cleaning tasks for upcoming checkouts.
    ///
    /// Idempotent: a reservation already referenced by a task is
    /// skipped. A task is urgent when another confirmed reservation on
    /// the property checks in on the cleaning date. One failing row
    /// never blocks the rest; the created count is returned.
    pub async fn sync_cleaning_tasks(&self, today: Day) -> Result<u32, EngineError> {
        let eligible = self.store.confirmed_checking_out_from(today).await?;

        let mut created = 0u32;
        for reservation in &eligible {
            match self.sync_one_checkout(reservation).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(reservation = %reservation.id, "cleaning sync skipped a row: {e}");
                }
            }
        }
        if created > 0 {
            metrics::counter!(observability::CLEANING_TASKS_CREATED_TOTAL)
                .increment(created as u64);
            info!(created, "cleaning tasks synchronized");
        }
        Ok(created)
    }

    async fn sync_one_checkout(&self, reservation: &Reservation) -> Result<bool, EngineError> {
        if self
            .store
            .cleaning_task_for_reservation(reservation.id)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        // The reservation's own check-in is always before its check-out,
        // so this probe can only find a different stay.
        let next = self
            .store
            .next_confirmed_check_in(reservation.property_id, reservation.check_out)
            .await?;
        let urgent = next.is_some_and(|n| n.check_in == reservation.check_out);

        let task = CleaningTask {
            id: Ulid::new(),
            reservation_id: Some(reservation.id),
            property_id: reservation.property_id,
            cleaner_id: None,
            cleaning_date: reservation.check_out,
            window: TimeWindow::default(),
            status: TaskStatus::Pending,
            priority: if urgent { Priority::Urgent } else { Priority::Normal },
            notes: None,
            whatsapp_sent: false,
            whatsapp_sent_at: None,
            completed_at: None,
        };
        self.store.insert_cleaning_task(task).await?;
        Ok(true)
    }

    /// Flip confirmed reservations whose checkout has passed to
    /// completed, then notify every admin about each transition.
    ///
    /// The only transition performed is confirmed → completed; cancelled
    /// rows are never touched. Notification failure is logged and never
    /// rolls back the status change, and a re-run finds no past-due
    /// confirmed rows, so overlapping sweeps are harmless.
    pub async fn sweep_lifecycle(&self, today: Day) -> Result<SweepReport, EngineError> {
        let past_due = self.store.confirmed_checked_out_before(today).await?;
        if past_due.is_empty() {
            return Ok(SweepReport::default());
        }

        let ids: Vec<Ulid> = past_due.iter().map(|r| r.id).collect();
        self.store
            .set_reservation_status(&ids, ReservationStatus::Completed)
            .await?;
        metrics::counter!(observability::SWEEP_COMPLETED_TOTAL).increment(ids.len() as u64);
        info!(completed = ids.len(), "past-due reservations completed");

        let admins = match self.store.profiles_with_role(Role::Admin).await {
            Ok(admins) => admins,
            Err(e) => {
                warn!("admin lookup failed, sweep notifications skipped: {e}");
                Vec::new()
            }
        };

        let mut notified = 0u32;
        if !admins.is_empty() {
            for reservation in &past_due {
                let property_name = match self.store.property(reservation.property_id).await {
                    Ok(Some(p)) => p.name,
                    _ => "Property".to_string(),
                };
                let rows =
                    notify::completion_notifications(&admins, reservation, &property_name);
                let count = rows.len() as u32;
                if let Err(e) = self.store.insert_notifications(rows).await {
                    warn!(reservation = %reservation.id, "notification insert failed: {e}");
                    continue;
                }
                notified += count;
            }
            if notified > 0 {
                metrics::counter!(observability::NOTIFICATIONS_TOTAL)
                    .increment(notified as u64);
            }
        }

        Ok(SweepReport {
            completed: ids.len() as u32,
            notified,
        })
    }
}
