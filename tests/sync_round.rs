use std::sync::Arc;

use chrono::Days;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use ulid::Ulid;

use staysync::engine::{today_utc, Engine, EngineError, InMemoryStore, Store};
use staysync::feed::FeedNormalizer;
use staysync::model::*;
use staysync::notify;

// ── Test infrastructure ──────────────────────────────────────

/// Serve the same canned HTTP response to every connection on a fresh
/// local port; returns the feed URL.
async fn spawn_feed_server(response: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}/export.ics")
}

fn ok_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/calendar\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

fn error_response() -> String {
    "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        .to_string()
}

/// All-day VEVENTs in the export shape the booking platforms publish.
fn ics_calendar(events: &[(Day, Day, &str)]) -> String {
    let mut out = String::from(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Hosting Calendar 1.0//EN\r\n",
    );
    for (start, end, uid) in events {
        out.push_str(&format!(
            "BEGIN:VEVENT\r\nUID:{uid}\r\nDTSTART;VALUE=DATE:{}\r\nDTEND;VALUE=DATE:{}\r\nSUMMARY:Reserved\r\nEND:VEVENT\r\n",
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        ));
    }
    out.push_str("END:VCALENDAR\r\n");
    out
}

async fn add_property(store: &InMemoryStore, name: &str) -> Ulid {
    let id = Ulid::new();
    store
        .insert_property(Property {
            id,
            owner_id: Ulid::new(),
            name: name.into(),
            location: None,
            status: PropertyStatus::Active,
            commission_percentage: None,
        })
        .await
        .unwrap();
    id
}

async fn add_feed(store: &InMemoryStore, property_id: Ulid, platform: &str, url: &str) {
    store
        .insert_feed(PlatformFeed {
            id: Ulid::new(),
            property_id,
            platform: platform.into(),
            ical_url: url.into(),
            active: true,
        })
        .await
        .unwrap();
}

async fn add_admin(store: &InMemoryStore, email: &str) -> Ulid {
    let id = Ulid::new();
    store
        .insert_profile(Profile {
            id,
            email: email.into(),
            full_name: None,
            phone: None,
            role: Role::Admin,
        })
        .await
        .unwrap();
    id
}

// ── Scenarios ────────────────────────────────────────────────

/// The whole operator round against live feed servers: pull feeds (one
/// of them broken), import the events, derive cleaning tasks, then
/// sweep once the stays are behind us.
#[tokio::test]
async fn sync_round_from_feeds_to_completed_reservations() {
    let store = Arc::new(InMemoryStore::new());
    let engine = Engine::new(store.clone());
    let normalizer = FeedNormalizer::new().unwrap();

    let pid = add_property(&store, "Villa Sol").await;
    let admin = add_admin(&store, "admin@example.com").await;

    // Back-to-back stays: the second checks in the day the first
    // checks out, so the first checkout's cleaning is urgent.
    let today = today_utc();
    let a_in = today + Days::new(2);
    let a_out = today + Days::new(5);
    let b_out = today + Days::new(8);

    let airbnb = spawn_feed_server(ok_response(&ics_calendar(&[
        (a_in, a_out, "stay-a@airbnb.com"),
        (a_out, b_out, "stay-b@airbnb.com"),
    ])))
    .await;
    let booking = spawn_feed_server(error_response()).await;
    add_feed(&store, pid, "airbnb", &airbnb).await;
    add_feed(&store, pid, "booking", &booking).await;

    // The broken feed is skipped; both airbnb events land.
    let imported = engine.sync_all_feeds(&normalizer).await.unwrap();
    assert_eq!(imported, 2);

    // A second round re-reads the same exports and imports nothing.
    let again = engine.sync_all_feeds(&normalizer).await.unwrap();
    assert_eq!(again, 0);

    let created = engine.sync_cleaning_tasks(today).await.unwrap();
    assert_eq!(created, 2);

    let first = store
        .reservation_by_external_ref(pid, "stay-a@airbnb.com")
        .await
        .unwrap()
        .unwrap();
    let second = store
        .reservation_by_external_ref(pid, "stay-b@airbnb.com")
        .await
        .unwrap()
        .unwrap();
    let first_task = store
        .cleaning_task_for_reservation(first.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first_task.priority, Priority::Urgent);
    assert_eq!(first_task.cleaning_date, a_out);
    let second_task = store
        .cleaning_task_for_reservation(second.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second_task.priority, Priority::Normal);

    // Once both stays are behind us, the sweep completes them and
    // tells the admin about each.
    let report = engine
        .sweep_lifecycle(b_out + Days::new(1))
        .await
        .unwrap();
    assert_eq!(report.completed, 2);
    assert_eq!(report.notified, 2);

    let rows = store.notifications_for_user(admin).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|n| !n.read));
    assert!(rows.iter().all(|n| n.message.contains("Villa Sol")));
}

/// The dashboard hands an urgent task to whichever cleaner is on the
/// active roster, as a wa.me deep link with the assignment pre-filled.
#[tokio::test]
async fn urgent_task_hands_off_to_an_active_cleaner() {
    let store = Arc::new(InMemoryStore::new());
    let engine = Engine::new(store.clone());

    let pid = add_property(&store, "Casa Mar").await;
    store
        .insert_cleaner(Cleaner {
            id: Ulid::new(),
            name: "Limpiezas Norte".into(),
            phone: "+34 612-345-678".into(),
            kind: CleanerKind::Company,
            active: true,
            notes: None,
        })
        .await
        .unwrap();
    store
        .insert_cleaner(Cleaner {
            id: Ulid::new(),
            name: "Retired".into(),
            phone: "+34 600-000-000".into(),
            kind: CleanerKind::Individual,
            active: false,
            notes: None,
        })
        .await
        .unwrap();

    let today = today_utc();
    let reservation = engine
        .create_reservation(
            pid,
            Stay::new(today + Days::new(1), today + Days::new(4)),
            NewReservation {
                guest_name: Some("Ana García".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine
        .create_reservation(
            pid,
            Stay::new(today + Days::new(4), today + Days::new(7)),
            NewReservation::default(),
        )
        .await
        .unwrap();
    engine.sync_cleaning_tasks(today).await.unwrap();

    let roster = store.active_cleaners().await.unwrap();
    assert_eq!(roster.len(), 1);
    let cleaner = &roster[0];

    let task = store
        .cleaning_task_for_reservation(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.priority, Priority::Urgent);
    let message = notify::cleaning_message(&task, "Casa Mar", Some("Ana García"));
    let link = notify::whatsapp_link(&cleaner.phone, &message);
    assert!(link.starts_with("https://wa.me/34612345678?text="));
    assert!(message.contains("Casa Mar"));
    assert!(message.contains("11:00-16:00"));
}

/// The feed registry is capped per sync round; nothing is fetched when
/// the cap is blown.
#[tokio::test]
async fn oversized_feed_registry_is_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let engine = Engine::new(store.clone());
    let normalizer = FeedNormalizer::new().unwrap();

    let pid = add_property(&store, "Villa Sol").await;
    for i in 0..51 {
        add_feed(&store, pid, "airbnb", &format!("http://127.0.0.1:9/feed-{i}.ics")).await;
    }

    let result = engine.sync_all_feeds(&normalizer).await;
    assert!(matches!(result, Err(EngineError::LimitExceeded(_))));
}
