use super::*;
use crate::limits::*;
use crate::venue::{InMemoryVenueDirectory, OperatingHours, Venue};

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("pitchtime_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2031, 5, d).unwrap()
}

fn at(d: u32, h: u32, m: u32) -> Ts {
    day(d).and_hms_opt(h, m, 0).unwrap()
}

struct Fixture {
    engine: Arc<Engine>,
    directory: Arc<InMemoryVenueDirectory>,
    venue: Venue,
}

fn venue(price: Decimal, open: &str, close: &str) -> Venue {
    Venue {
        id: Ulid::new(),
        owner_id: Ulid::new(),
        name: "Riverside Pitch".into(),
        price_per_hour: price,
        hours: OperatingHours::parse(open, close).unwrap(),
        is_active: true,
    }
}

fn fixture_at(path: PathBuf) -> Fixture {
    let directory = Arc::new(InMemoryVenueDirectory::new());
    let venue = venue(dec!(100.00), "08:00", "22:00");
    directory.insert(venue.clone());
    let engine = Engine::new(path, directory.clone(), Arc::new(NotifyHub::new())).unwrap();
    Fixture {
        engine: Arc::new(engine),
        directory,
        venue,
    }
}

fn fixture(name: &str) -> Fixture {
    fixture_at(test_wal_path(name))
}

fn request(venue_id: Ulid, user_id: Ulid, start: Ts, end: Ts) -> NewBooking {
    NewBooking {
        venue_id,
        user_id,
        start,
        end,
        notes: None,
    }
}

// ── Creation and pricing ─────────────────────────────────

#[tokio::test]
async fn create_two_hour_booking() {
    let f = fixture("create_two_hour.wal");
    let user = Ulid::new();
    let r = assert_ok!(
        f.engine
            .create_booking(request(f.venue.id, user, at(10, 10, 0), at(10, 12, 0)))
            .await
    );

    assert_eq!(r.total_price, dec!(200.00));
    assert_eq!(r.status, BookingStatus::Pending);
    assert_eq!(r.user_id, user);
    assert_eq!(r.created_at, r.updated_at);
    assert_eq!(
        r.hold_expires_at,
        Some(r.created_at + TimeDelta::seconds(HOLD_WINDOW_SECS))
    );

    let confirmed = assert_ok!(f.engine.confirm_booking(r.id, Actor::User(user)).await);
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert!(confirmed.hold_expires_at.is_none());
}

#[tokio::test]
async fn half_hour_price_and_overlap_rejection() {
    let f = fixture("half_hour.wal");
    let r = f
        .engine
        .create_booking(request(f.venue.id, Ulid::new(), at(10, 9, 0), at(10, 9, 30)))
        .await
        .unwrap();
    assert_eq!(r.total_price, dec!(50.00));

    let clash = f
        .engine
        .create_booking(request(f.venue.id, Ulid::new(), at(10, 9, 15), at(10, 9, 45)))
        .await;
    match clash {
        Err(EngineError::SlotUnavailable(holder)) => assert_eq!(holder, r.id),
        other => panic!("expected SlotUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn touching_bookings_do_not_conflict() {
    let f = fixture("touching.wal");
    let v = f.venue.id;
    assert_ok!(
        f.engine
            .create_booking(request(v, Ulid::new(), at(10, 10, 0), at(10, 11, 0)))
            .await
    );
    assert_ok!(
        f.engine
            .create_booking(request(v, Ulid::new(), at(10, 11, 0), at(10, 12, 0)))
            .await
    );
    assert_ok!(
        f.engine
            .create_booking(request(v, Ulid::new(), at(10, 9, 0), at(10, 10, 0)))
            .await
    );
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let f = fixture("bad_input.wal");
    let v = f.venue.id;

    let inverted = f
        .engine
        .create_booking(request(v, Ulid::new(), at(10, 12, 0), at(10, 10, 0)))
        .await;
    assert!(matches!(inverted, Err(EngineError::InvalidRange(_))));

    let empty = f
        .engine
        .create_booking(request(v, Ulid::new(), at(10, 12, 0), at(10, 12, 0)))
        .await;
    assert!(matches!(empty, Err(EngineError::InvalidRange(_))));

    let too_short = f
        .engine
        .create_booking(request(v, Ulid::new(), at(10, 12, 0), at(10, 12, 0) + TimeDelta::seconds(30)))
        .await;
    assert!(matches!(too_short, Err(EngineError::InvalidRange(_))));

    let mut long_notes = request(v, Ulid::new(), at(10, 12, 0), at(10, 13, 0));
    long_notes.notes = Some("x".repeat(MAX_NOTES_LEN + 1));
    let result = f.engine.create_booking(long_notes).await;
    assert!(matches!(result, Err(EngineError::LimitExceeded(_))));

    let unknown = f
        .engine
        .create_booking(request(Ulid::new(), Ulid::new(), at(10, 12, 0), at(10, 13, 0)))
        .await;
    assert!(matches!(unknown, Err(EngineError::VenueNotFound(_))));

    // Nothing was stored.
    assert!(f.engine.list_venue_bookings(v, Page::default()).await.is_empty());
}

#[tokio::test]
async fn multi_day_booking_is_accepted() {
    let f = fixture("multi_day.wal");
    let r = assert_ok!(
        f.engine
            .create_booking(request(f.venue.id, Ulid::new(), at(1, 0, 0), at(10, 0, 0)))
            .await
    );
    assert_eq!(r.total_price, dec!(21600.00));
    assert!(f.engine.conflicts(f.venue.id, at(5, 12, 0), at(5, 13, 0), None).await.unwrap());
}

#[tokio::test]
async fn inactive_venue_rejects_bookings() {
    let f = fixture("inactive.wal");
    let mut closed = venue(dec!(40.00), "08:00", "22:00");
    closed.is_active = false;
    f.directory.insert(closed.clone());

    let result = f
        .engine
        .create_booking(request(closed.id, Ulid::new(), at(10, 10, 0), at(10, 11, 0)))
        .await;
    assert!(matches!(result, Err(EngineError::VenueNotFound(id)) if id == closed.id));
}

#[tokio::test]
async fn concurrent_creates_have_one_winner() {
    let f = fixture("concurrent.wal");
    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = f.engine.clone();
        let v = f.venue.id;
        handles.push(tokio::spawn(async move {
            engine
                .create_booking(request(v, Ulid::new(), at(12, 18, 0), at(12, 19, 0)))
                .await
        }));
    }

    let mut won = 0;
    let mut lost = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => won += 1,
            Err(EngineError::SlotUnavailable(_)) => lost += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(lost, 15);
    assert_eq!(f.engine.list_venue_bookings(f.venue.id, Page::default()).await.len(), 1);
}

// ── Lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn cancel_frees_slot() {
    let f = fixture("cancel_frees.wal");
    let user = Ulid::new();
    let v = f.venue.id;
    let r = f
        .engine
        .create_booking(request(v, user, at(11, 15, 0), at(11, 16, 0)))
        .await
        .unwrap();
    assert!(f.engine.conflicts(v, at(11, 15, 30), at(11, 16, 30), None).await.unwrap());
    assert!(!f.engine.conflicts(v, at(11, 15, 30), at(11, 16, 30), Some(r.id)).await.unwrap());

    let cancelled = f.engine.cancel_booking(r.id, Actor::User(user)).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(cancelled.updated_at >= r.updated_at);

    assert!(!f.engine.conflicts(v, at(11, 15, 30), at(11, 16, 30), None).await.unwrap());
    assert_ok!(
        f.engine
            .create_booking(request(v, Ulid::new(), at(11, 15, 0), at(11, 16, 0)))
            .await
    );
}

#[tokio::test]
async fn terminal_states_reject_transitions() {
    let f = fixture("terminal.wal");
    let uid = Ulid::new();
    let user = Actor::User(uid);
    let r = f
        .engine
        .create_booking(request(f.venue.id, uid, at(11, 8, 0), at(11, 9, 0)))
        .await
        .unwrap();
    let cancelled = f.engine.cancel_booking(r.id, user).await.unwrap();

    let err = assert_err!(f.engine.confirm_booking(r.id, user).await);
    assert!(matches!(
        err,
        EngineError::InvalidState { status: BookingStatus::Cancelled, .. }
    ));
    assert_err!(f.engine.cancel_booking(r.id, user).await);

    let stored = f.engine.get_booking(r.id, user).await.unwrap();
    assert_eq!(stored, cancelled);
}

#[tokio::test]
async fn confirmed_booking_can_be_cancelled_not_reconfirmed() {
    let f = fixture("confirm_cancel.wal");
    let uid = Ulid::new();
    let user = Actor::User(uid);
    let r = f
        .engine
        .create_booking(request(f.venue.id, uid, at(11, 8, 0), at(11, 9, 0)))
        .await
        .unwrap();
    f.engine.confirm_booking(r.id, user).await.unwrap();
    assert!(matches!(
        f.engine.confirm_booking(r.id, user).await,
        Err(EngineError::InvalidState { status: BookingStatus::Confirmed, .. })
    ));
    let cancelled = f.engine.cancel_booking(r.id, user).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn other_users_cannot_see_or_touch_booking() {
    let f = fixture("ownership.wal");
    let owner = Ulid::new();
    let r = f
        .engine
        .create_booking(request(f.venue.id, owner, at(13, 10, 0), at(13, 11, 0)))
        .await
        .unwrap();
    let stranger = Actor::User(Ulid::new());

    assert!(matches!(f.engine.get_booking(r.id, stranger).await, Err(EngineError::NotFound(_))));
    assert!(matches!(f.engine.confirm_booking(r.id, stranger).await, Err(EngineError::NotFound(_))));
    assert!(matches!(f.engine.cancel_booking(r.id, stranger).await, Err(EngineError::NotFound(_))));
    assert_eq!(
        f.engine.get_booking(r.id, Actor::User(owner)).await.unwrap().status,
        BookingStatus::Pending
    );

    // Admins act on anyone's booking.
    let confirmed = f.engine.confirm_booking(r.id, Actor::Admin).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn unknown_reservation_is_not_found() {
    let f = fixture("unknown.wal");
    let id = Ulid::new();
    assert!(matches!(f.engine.confirm_booking(id, Actor::Admin).await, Err(EngineError::NotFound(x)) if x == id));
    assert!(matches!(f.engine.expire_booking(id).await, Err(EngineError::NotFound(_))));
    assert!(matches!(f.engine.get_booking(id, Actor::Admin).await, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn expiry_releases_slot() {
    let f = fixture("expiry.wal");
    let v = f.venue.id;
    let r = f
        .engine
        .create_booking(request(v, Ulid::new(), at(14, 20, 0), at(14, 21, 0)))
        .await
        .unwrap();
    let deadline = r.hold_expires_at.unwrap();

    assert!(f.engine.collect_expired_holds(deadline - TimeDelta::seconds(1)).is_empty());
    let due = f.engine.collect_expired_holds(deadline);
    assert_eq!(due, vec![(r.id, v)]);

    let expired = f.engine.expire_booking(r.id).await.unwrap().unwrap();
    assert_eq!(expired.status, BookingStatus::Expired);
    assert!(f.engine.collect_expired_holds(deadline).is_empty());

    // A second expiry is a no-op.
    assert!(f.engine.expire_booking(r.id).await.unwrap().is_none());

    assert_ok!(
        f.engine
            .create_booking(request(v, Ulid::new(), at(14, 20, 0), at(14, 21, 0)))
            .await
    );
}

#[tokio::test]
async fn expire_after_confirm_is_noop() {
    let f = fixture("expire_race.wal");
    let uid = Ulid::new();
    let r = f
        .engine
        .create_booking(request(f.venue.id, uid, at(14, 9, 0), at(14, 10, 0)))
        .await
        .unwrap();
    f.engine.confirm_booking(r.id, Actor::User(uid)).await.unwrap();

    assert!(f.engine.expire_booking(r.id).await.unwrap().is_none());
    let stored = f.engine.get_booking(r.id, Actor::Admin).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn complete_only_confirmed() {
    let f = fixture("complete.wal");
    let uid = Ulid::new();
    let pending = f
        .engine
        .create_booking(request(f.venue.id, uid, at(15, 8, 0), at(15, 9, 0)))
        .await
        .unwrap();
    assert!(f.engine.complete_booking(pending.id).await.unwrap().is_none());

    f.engine.confirm_booking(pending.id, Actor::User(uid)).await.unwrap();
    assert!(f.engine.collect_finished(at(15, 8, 59)).is_empty());
    assert_eq!(f.engine.collect_finished(at(15, 9, 0)).len(), 1);

    let done = f.engine.complete_booking(pending.id).await.unwrap().unwrap();
    assert_eq!(done.status, BookingStatus::Completed);
    assert!(matches!(
        f.engine.cancel_booking(pending.id, Actor::User(uid)).await,
        Err(EngineError::InvalidState { status: BookingStatus::Completed, .. })
    ));
}

// ── Listings ─────────────────────────────────────────────

#[tokio::test]
async fn user_listing_newest_first_with_paging() {
    let f = fixture("user_listing.wal");
    let uid = Ulid::new();
    let mut ids = Vec::new();
    for h in 8..13 {
        let r = f
            .engine
            .create_booking(request(f.venue.id, uid, at(16, h, 0), at(16, h + 1, 0)))
            .await
            .unwrap();
        ids.push(r.id);
    }
    f.engine
        .create_booking(request(f.venue.id, Ulid::new(), at(16, 14, 0), at(16, 15, 0)))
        .await
        .unwrap();

    let all = f.engine.list_user_bookings(uid, Page::default()).await;
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|r| r.user_id == uid));
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let page = f.engine.list_user_bookings(uid, Page::new(1, 2)).await;
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, all[1].id);
    assert_eq!(page[1].id, all[2].id);

    assert!(f.engine.list_user_bookings(uid, Page::new(10, 10)).await.is_empty());
    assert!(f.engine.list_user_bookings(Ulid::new(), Page::default()).await.is_empty());
}

#[tokio::test]
async fn venue_listing_latest_start_first() {
    let f = fixture("venue_listing.wal");
    for h in [9, 15, 12] {
        f.engine
            .create_booking(request(f.venue.id, Ulid::new(), at(17, h, 0), at(17, h + 1, 0)))
            .await
            .unwrap();
    }
    let listed = f.engine.list_venue_bookings(f.venue.id, Page::default()).await;
    let starts: Vec<_> = listed.iter().map(|r| r.start_time).collect();
    assert_eq!(starts, vec![at(17, 15, 0), at(17, 12, 0), at(17, 9, 0)]);
}

#[tokio::test]
async fn venue_listing_requires_owner_or_admin() {
    let f = fixture("venue_listing_auth.wal");
    f.engine
        .create_booking(request(f.venue.id, Ulid::new(), at(17, 9, 0), at(17, 10, 0)))
        .await
        .unwrap();

    let owner = Actor::User(f.venue.owner_id);
    assert_eq!(
        f.engine
            .list_venue_bookings_as(f.venue.id, owner, Page::default())
            .await
            .unwrap()
            .len(),
        1
    );
    assert_ok!(
        f.engine
            .list_venue_bookings_as(f.venue.id, Actor::Admin, Page::default())
            .await
    );
    let err = f
        .engine
        .list_venue_bookings_as(f.venue.id, Actor::User(Ulid::new()), Page::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

// ── Availability ─────────────────────────────────────────

#[tokio::test]
async fn hourly_view_after_confirm() {
    let f = fixture("hourly_view.wal");
    let uid = Ulid::new();
    let r = f
        .engine
        .create_booking(request(f.venue.id, uid, at(20, 10, 0), at(20, 12, 0)))
        .await
        .unwrap();
    f.engine.confirm_booking(r.id, Actor::User(uid)).await.unwrap();

    let view = f
        .engine
        .hourly_availability_on(f.venue.id, day(20), day(19))
        .await
        .unwrap();
    assert_eq!(view.venue_name, "Riverside Pitch");
    assert_eq!(view.total_slots, 14);
    assert_eq!(view.available_slots, 12);
    for slot in &view.slots {
        let busy = slot.hour == NaiveTime::from_hms_opt(10, 0, 0).unwrap()
            || slot.hour == NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        assert_eq!(slot.is_available, !busy, "slot {}", slot.hour);
        assert_eq!(slot.status == SlotStatus::Red, busy);
    }
}

#[tokio::test]
async fn hourly_view_rejects_past_dates() {
    let f = fixture("hourly_past.wal");
    let result = f.engine.hourly_availability_on(f.venue.id, day(18), day(19)).await;
    assert!(matches!(result, Err(EngineError::InvalidRequest(_))));

    // Today is fine.
    assert_ok!(f.engine.hourly_availability_on(f.venue.id, day(19), day(19)).await);

    let unknown = f.engine.hourly_availability_on(Ulid::new(), day(20), day(19)).await;
    assert!(matches!(unknown, Err(EngineError::VenueNotFound(_))));
}

#[tokio::test]
async fn weekly_view_counts_active_bookings() {
    let f = fixture("weekly_view.wal");
    let uid = Ulid::new();
    // today = 20th, so the second day of the window is the 22nd
    for h in [8, 10, 12] {
        f.engine
            .create_booking(request(f.venue.id, uid, at(22, h, 0), at(22, h + 1, 0)))
            .await
            .unwrap();
    }
    let dropped = f
        .engine
        .create_booking(request(f.venue.id, uid, at(22, 14, 0), at(22, 15, 0)))
        .await
        .unwrap();
    f.engine.cancel_booking(dropped.id, Actor::User(uid)).await.unwrap();

    let view = f.engine.weekly_availability_from(f.venue.id, day(20)).await.unwrap();
    assert_eq!(view.venue_id, f.venue.id);
    assert_eq!(view.days.len(), AVAILABILITY_DAYS as usize);
    assert_eq!(view.days[0].date, day(21));
    assert_eq!(view.days[0].status, AvailabilityLevel::Green);
    assert_eq!(view.days[0].available_slots, 14);
    assert_eq!(view.days[1].booking_count, 3);
    assert_eq!(view.days[1].status, AvailabilityLevel::Yellow);
    assert_eq!(view.days[1].available_slots, 11);
}

#[tokio::test]
async fn weekly_view_for_venue_without_bookings() {
    let f = fixture("weekly_empty.wal");
    let view = f.engine.weekly_availability_from(f.venue.id, day(1)).await.unwrap();
    assert!(view.days.iter().all(|d| d.booking_count == 0));
    assert!(f.engine.venue_state(&f.venue.id).is_none());
}

// ── Persistence ──────────────────────────────────────────

#[tokio::test]
async fn replay_restores_status_and_hold() {
    let path = test_wal_path("replay_restore.wal");
    let uid = Ulid::new();
    let (pending, confirmed, cancelled, venue_id);
    {
        let f = fixture_at(path.clone());
        venue_id = f.venue.id;
        let user = Actor::User(uid);
        pending = f
            .engine
            .create_booking(request(venue_id, uid, at(23, 8, 0), at(23, 9, 0)))
            .await
            .unwrap();
        confirmed = f
            .engine
            .create_booking(request(venue_id, uid, at(23, 10, 0), at(23, 11, 0)))
            .await
            .unwrap();
        f.engine.confirm_booking(confirmed.id, user).await.unwrap();
        cancelled = f
            .engine
            .create_booking(request(venue_id, uid, at(23, 12, 0), at(23, 13, 0)))
            .await
            .unwrap();
        f.engine.cancel_booking(cancelled.id, user).await.unwrap();
    }

    let f = fixture_at(path);
    let a = Actor::Admin;
    assert_eq!(f.engine.get_booking(pending.id, a).await.unwrap(), pending);
    let c = f.engine.get_booking(confirmed.id, a).await.unwrap();
    assert_eq!(c.status, BookingStatus::Confirmed);
    assert!(c.hold_expires_at.is_none());
    assert_eq!(
        f.engine.get_booking(cancelled.id, a).await.unwrap().status,
        BookingStatus::Cancelled
    );
    assert_eq!(f.engine.venue_for_reservation(&pending.id), Some(venue_id));
    assert_eq!(f.engine.list_user_bookings(uid, Page::default()).await.len(), 3);

    // Replayed claims still block, released ones don't.
    assert!(f.engine.conflicts(venue_id, at(23, 8, 30), at(23, 8, 45), None).await.unwrap());
    assert!(!f.engine.conflicts(venue_id, at(23, 12, 0), at(23, 13, 0), None).await.unwrap());
}

#[tokio::test]
async fn writes_after_torn_tail_survive_next_restart() {
    use std::io::Write;

    let path = test_wal_path("torn_tail_restart.wal");
    let uid = Ulid::new();
    let (first, venue) = {
        let f = fixture_at(path.clone());
        let r = f
            .engine
            .create_booking(request(f.venue.id, uid, at(24, 8, 0), at(24, 9, 0)))
            .await
            .unwrap();
        (r, f.venue)
    };
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0x2a, 0, 0, 0, 1, 2, 3]).unwrap();
    }

    let second = {
        let f = fixture_at(path.clone());
        f.directory.insert(venue.clone());
        let r = assert_ok!(
            f.engine
                .create_booking(request(venue.id, uid, at(24, 10, 0), at(24, 11, 0)))
                .await
        );
        assert_ok!(f.engine.confirm_booking(first.id, Actor::User(uid)).await);
        r
    };

    let f = fixture_at(path);
    let a = Actor::Admin;
    assert_eq!(f.engine.get_booking(second.id, a).await.unwrap(), second);
    assert_eq!(
        f.engine.get_booking(first.id, a).await.unwrap().status,
        BookingStatus::Confirmed
    );
}

#[tokio::test]
async fn compaction_keeps_state() {
    let path = test_wal_path("compaction.wal");
    let uid = Ulid::new();
    let mut kept = Vec::new();
    {
        let f = fixture_at(path.clone());
        for h in 8..18 {
            let r = f
                .engine
                .create_booking(request(f.venue.id, uid, at(24, h, 0), at(24, h + 1, 0)))
                .await
                .unwrap();
            if h % 2 == 0 {
                f.engine.cancel_booking(r.id, Actor::User(uid)).await.unwrap();
            }
            kept.push(r.id);
        }
        assert_eq!(f.engine.wal_appends_since_compact().await, 15);
        let before = std::fs::metadata(&path).unwrap().len();
        f.engine.compact_wal().await.unwrap();
        assert_eq!(f.engine.wal_appends_since_compact().await, 0);
        assert!(std::fs::metadata(&path).unwrap().len() < before);
    }

    let f = fixture_at(path);
    let listed = f.engine.list_user_bookings(uid, Page::new(0, 50)).await;
    assert_eq!(listed.len(), kept.len());
    let cancelled = listed
        .iter()
        .filter(|r| r.status == BookingStatus::Cancelled)
        .count();
    assert_eq!(cancelled, 5);
}

// ── Notifications ────────────────────────────────────────

#[tokio::test]
async fn subscribers_see_lifecycle_events() {
    let f = fixture("notify.wal");
    let mut rx = f.engine.notify.subscribe(f.venue.id);
    let uid = Ulid::new();

    let r = f
        .engine
        .create_booking(request(f.venue.id, uid, at(25, 10, 0), at(25, 11, 0)))
        .await
        .unwrap();
    f.engine.confirm_booking(r.id, Actor::User(uid)).await.unwrap();

    match rx.recv().await.unwrap() {
        Event::BookingCreated { reservation } => assert_eq!(reservation.id, r.id),
        other => panic!("unexpected {other:?}"),
    }
    match rx.recv().await.unwrap() {
        Event::BookingConfirmed { id, venue_id, .. } => {
            assert_eq!(id, r.id);
            assert_eq!(venue_id, f.venue.id);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn rejected_create_emits_nothing() {
    let f = fixture("notify_reject.wal");
    f.engine
        .create_booking(request(f.venue.id, Ulid::new(), at(25, 10, 0), at(25, 11, 0)))
        .await
        .unwrap();
    let mut rx = f.engine.notify.subscribe(f.venue.id);
    assert_err!(
        f.engine
            .create_booking(request(f.venue.id, Ulid::new(), at(25, 10, 30), at(25, 11, 30)))
            .await
    );
    assert!(rx.try_recv().is_err());
}
