/// Integration test: walk one SOS ticket through its whole life —
/// creation over an existing active ticket, evidence accumulation with
/// dedup, analysis overwrite, closure.
use beacon_db::Database;

#[test]
fn full_ticket_lifecycle() {
    let db = Database::open_in_memory().unwrap();
    db.create_user("u1", "asha", "hash", "Asha", Some("asha@example.com"))
        .unwrap();

    // first SOS
    db.create_ticket("t1", "u1", None, 28.6139, 77.2090, "2026-08-30 09:00:00")
        .unwrap();

    // second SOS: the old ticket is closed first
    assert_eq!(db.close_active_for_user("u1").unwrap(), 1);
    db.create_ticket("t2", "u1", None, 28.6150, 77.2100, "2026-08-30 10:00:00")
        .unwrap();

    let tickets = db.list_tickets_for_user("u1").unwrap();
    assert_eq!(tickets.len(), 2);
    assert_eq!(
        tickets.iter().filter(|t| t.status == "active").count(),
        1
    );

    // location trail: new second -> appended, same second -> merged
    assert!(db.upsert_location("t2", 28.6160, 77.2110, "2026-08-30 10:00:30").unwrap());
    assert!(!db.upsert_location("t2", 28.6161, 77.2111, "2026-08-30 10:00:30").unwrap());
    assert_eq!(db.get_locations("t2").unwrap().len(), 2);

    // evidence with retried registration
    assert!(
        db.insert_media("m1", "t2", "video", "https://cdn/v.mp4", "b/v1", "2026-08-30 10:01:00")
            .unwrap()
    );
    assert!(
        !db.insert_media("m1b", "t2", "video", "https://cdn/v.mp4", "b/v1", "2026-08-30 10:01:05")
            .unwrap()
    );
    assert_eq!(db.count_media("t2", "video").unwrap(), 1);

    // analysis lands, then a later lower-score report still overwrites
    db.set_ticket_analysis("t2", "{\"score\":7}", 7).unwrap();
    db.set_ticket_analysis("t2", "{\"score\":4}", 4).unwrap();
    db.update_media_transcript("t2", "video", "b/v1", "summary", Some("सारांश"))
        .unwrap();

    let t2 = db.get_ticket("t2", "u1").unwrap().unwrap();
    assert_eq!(t2.priority, 4);

    let videos = db.list_media("t2", "video").unwrap();
    assert_eq!(videos[0].transcript.as_deref(), Some("summary"));
    assert_eq!(videos[0].transcript_local.as_deref(), Some("सारांश"));

    // closure is terminal and scoped
    assert!(db.close_ticket("t2", "u1").unwrap());
    assert_eq!(db.get_ticket("t2", "u1").unwrap().unwrap().status, "closed");
    assert_eq!(db.close_active_for_user("u1").unwrap(), 0);
}
