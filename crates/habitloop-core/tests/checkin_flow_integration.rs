//! Integration tests for the check-in completion flow.
//!
//! Drives timer, registry and controller together the way a check-in screen
//! does, against the SQLite store and an unreachable milestone service.

use std::cell::Cell;
use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use habitloop_core::{
    Challenge, CheckInFlowController, Database, Event, FlowState, FlowStep, MilestoneDays,
    MilestoneRegistry, MilestoneStore, RemoteError, Stage, StageChoice, TimerSession,
};

/// Milestone service that is never reachable.
#[derive(Default)]
struct OfflineStore {
    write_attempts: Cell<usize>,
}

impl MilestoneStore for OfflineStore {
    async fn fetch_seen_milestones(&self, _challenge_id: &str) -> Result<BTreeSet<u32>, RemoteError> {
        Err(RemoteError::new("fetch_seen_milestones", "offline"))
    }

    async fn record_milestone_seen(&self, _challenge_id: &str, _day: u32) -> Result<(), RemoteError> {
        self.write_attempts.set(self.write_attempts.get() + 1);
        Err(RemoteError::new("record_milestone_seen", "offline"))
    }
}

#[tokio::test]
async fn day_thirty_with_ten_minute_timer() {
    let db = Database::open_memory().unwrap();
    let refreshes = Cell::new(0);

    // Ten minute session with a trip to the background in the middle.
    let start = Utc::now();
    let mut timer = TimerSession::new(10 * 60);
    timer.start(start);
    timer.tick(start + Duration::minutes(3));
    timer.on_backgrounded(start + Duration::minutes(3));
    let done = timer.on_foregrounded(start + Duration::minutes(11));
    assert!(matches!(done, Some(Event::TimerCompleted { .. })));

    let registry = MilestoneRegistry::new(&db, MilestoneDays::default());
    let mut flow = CheckInFlowController::new(&db, registry, || {
        refreshes.set(refreshes.get() + 1)
    });

    let challenge = Challenge::timed("cold-shower", 30);
    let mut observed = Vec::new();

    match flow.submit(&challenge, Some(&timer)).await.unwrap() {
        FlowStep::Presenting(stage) => observed.push(stage),
        FlowStep::Closed => panic!("flow closed early"),
    }
    match flow.advance(StageChoice::Continue).await.unwrap() {
        FlowStep::Presenting(stage) => observed.push(stage),
        FlowStep::Closed => panic!("flow closed early"),
    }
    assert_eq!(flow.advance(StageChoice::Finish).await.unwrap(), FlowStep::Closed);

    // The remote write is still queued until someone drives it.
    assert_eq!(flow.registry().pending_writes(), 1);
    assert!(db.seen_milestones("cold-shower").unwrap().is_empty());
    let report = flow.flush_pending().await;
    assert_eq!(report.delivered, 1);

    assert_eq!(observed, vec![Stage::Milestone { day: 30 }, Stage::Success]);
    assert!(flow.registry().is_seen("cold-shower", 30));
    assert_eq!(db.seen_milestones("cold-shower").unwrap(), BTreeSet::from([30]));
    assert_eq!(db.check_ins("cold-shower").unwrap()[0].duration_secs, Some(600));

    let kinds: Vec<&str> = flow.drain_events().iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "check_in_submitted",
            "milestones_synced",
            "milestone_celebrated",
            "stage_presented",
            "stage_presented",
            "flow_closed",
        ]
    );

    drop(flow);
    assert_eq!(refreshes.get(), 1);
}

#[tokio::test]
async fn milestone_seen_on_another_device_is_not_repeated() {
    let db = Database::open_memory().unwrap();
    db.mark_milestone_seen("reading", 7, Utc::now()).unwrap();

    let registry = MilestoneRegistry::new(&db, MilestoneDays::default());
    let mut flow = CheckInFlowController::new(&db, registry, || {});
    let step = flow.submit(&Challenge::new("reading", 7), None).await.unwrap();
    assert_eq!(step, FlowStep::Presenting(Stage::Success));
}

#[tokio::test]
async fn sync_failure_never_blocks_the_flow() {
    let db = Database::open_memory().unwrap();
    let offline = OfflineStore::default();

    let registry = MilestoneRegistry::new(&offline, MilestoneDays::default());
    let mut flow = CheckInFlowController::new(&db, registry, || {});
    let step = flow.submit(&Challenge::new("reading", 30), None).await.unwrap();
    assert_eq!(step, FlowStep::Presenting(Stage::Milestone { day: 30 }));

    let report = flow.flush_pending().await;
    assert_eq!(report.failed, 1);
    assert_eq!(offline.write_attempts.get(), 1);

    let events = flow.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::MilestonesSynced { degraded: true, .. })));

    // The failed remote write does not bring the celebration back.
    let registry = flow.into_registry();
    assert!(!registry.should_show("reading", 30));
    assert_eq!(registry.pending_writes(), 0);
}

#[tokio::test]
async fn registry_carries_over_between_flows() {
    let db = Database::open_memory().unwrap();
    let offline = OfflineStore::default();

    let registry = MilestoneRegistry::new(&offline, MilestoneDays::new([2]).unwrap());
    let mut first = CheckInFlowController::new(&db, registry, || {});
    first.submit(&Challenge::new("piano", 2), None).await.unwrap();
    first.dismiss();
    first.flush_pending().await;

    // The mark made during the first flow survives into the next one.
    let registry = first.into_registry();
    assert!(!registry.should_show("piano", 2));
    assert!(registry.should_show("guitar", 2));
}

#[tokio::test]
async fn add_note_path_ends_with_note_prompt() {
    let db = Database::open_memory().unwrap();
    let registry = MilestoneRegistry::new(&db, MilestoneDays::default());
    let mut flow = CheckInFlowController::new(&db, registry, || {});

    flow.submit(&Challenge::new("gratitude", 12), None).await.unwrap();
    assert_eq!(
        flow.advance(StageChoice::AddNote).await.unwrap(),
        FlowStep::Presenting(Stage::NotePrompt)
    );
    assert_eq!(
        flow.advance(StageChoice::SaveNote("three good things".into()))
            .await
            .unwrap(),
        FlowStep::Closed
    );
    assert_eq!(flow.state(), FlowState::Closed);
    assert_eq!(db.notes("gratitude").unwrap().len(), 1);
    assert!(flow.advance(StageChoice::Continue).await.is_err());
}

#[tokio::test]
async fn sqlite_store_runs_full_flow() {
    let db = Database::open_memory().unwrap();
    let refreshes = Cell::new(0);

    let registry = MilestoneRegistry::new(&db, MilestoneDays::default());
    let mut flow = CheckInFlowController::new(&db, registry, || refreshes.set(refreshes.get() + 1));
    flow.submit(&Challenge::new("walk", 3), None).await.unwrap();
    flow.advance(StageChoice::Continue).await.unwrap();
    flow.advance(StageChoice::AddNote).await.unwrap();
    flow.advance(StageChoice::SaveNote("rainy".into())).await.unwrap();
    flow.flush_pending().await;
    drop(flow);

    assert_eq!(refreshes.get(), 1);
    assert_eq!(db.check_ins("walk").unwrap().len(), 1);
    assert_eq!(db.notes("walk").unwrap()[0].text, "rainy");
    assert!(db.seen_milestones("walk").unwrap().contains(&3));

    // A fresh session on the same store does not celebrate day 3 again.
    let registry = MilestoneRegistry::new(&db, MilestoneDays::default());
    let mut again = CheckInFlowController::new(&db, registry, || {});
    again.prepare("walk").await;
    assert!(!again.registry().should_show("walk", 3));
}
