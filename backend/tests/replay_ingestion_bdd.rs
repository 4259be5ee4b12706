//! Behaviour-driven tests for replay ingestion and the record-broken trigger.

use std::sync::Arc;

use replayboard::domain::ports::UserSettingsRepository;
use replayboard::domain::{
    Error, ErrorCode, IngestedReplay, ReplayRecord, ReplayUpload, SettingUpdate, TrackId,
    TriggerOutcome, UserSettings,
};
use replayboard::test_support::GhostFileBuilder;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use tokio::runtime::{Builder, Runtime};

mod support;

use support::{Harness, SlowReplayRepository};

type SlowHarness = Harness<SlowReplayRepository>;
type Podium = Option<(ReplayRecord, Option<ReplayRecord>)>;

fn a01() -> TrackId {
    TrackId::new("A01-Race")
}

fn legacy(login: &str, millis: u32) -> GhostFileBuilder {
    GhostFileBuilder::legacy().login(login).race_time(millis)
}

/// Inserts stall briefly so uploads started together overlap.
#[derive(Default, ScenarioState)]
struct IngestionWorld {
    runtime: Slot<Arc<Runtime>>,
    harness: Slot<Arc<SlowHarness>>,
    last_upload: Slot<ReplayUpload>,
    last_result: Slot<Result<IngestedReplay, Error>>,
    podium_before: Slot<Podium>,
}

impl IngestionWorld {
    fn setup(&self) {
        let runtime = Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .expect("create runtime");
        self.runtime.set(Arc::new(runtime));
        self.harness.set(Arc::new(SlowHarness::new()));
    }

    fn runtime(&self) -> Arc<Runtime> {
        self.runtime.get().expect("runtime")
    }

    fn harness(&self) -> Arc<SlowHarness> {
        self.harness.get().expect("harness")
    }

    fn ingest(&self, upload: ReplayUpload) -> Result<IngestedReplay, Error> {
        let harness = self.harness();
        let result = self
            .runtime()
            .block_on(async { harness.ingestion.ingest(&upload).await });
        self.last_upload.set(upload);
        result
    }

    fn podium(&self) -> Podium {
        let harness = self.harness();
        self.runtime()
            .block_on(async { harness.leaderboard.podium(&a01()).await })
            .expect("podium")
    }

    fn last_ingested(&self) -> IngestedReplay {
        self.last_result
            .get()
            .expect("result should be set")
            .expect("upload should be accepted")
    }

    fn last_error(&self) -> Error {
        self.last_result
            .get()
            .expect("result should be set")
            .expect_err("upload should be rejected")
    }
}

#[fixture]
fn world() -> IngestionWorld {
    IngestionWorld::default()
}

// -----------------------------------------------------------------------------
// Given Steps
// -----------------------------------------------------------------------------

#[given("an empty leaderboard")]
fn an_empty_leaderboard(world: &IngestionWorld) {
    world.setup();
}

#[given("{login} holds A01-Race in {millis} ms")]
fn holds_a01_race(world: &IngestionWorld, login: String, millis: u32) {
    world
        .ingest(legacy(&login, millis).upload(&login))
        .expect("seed replay should be accepted");
}

#[given("{user} opted out of displacement notifications")]
fn opted_out_of_displacement_notifications(world: &IngestionWorld, user: String) {
    let harness = world.harness();
    let update = SettingUpdate::parse("notify_on_displacement", false).expect("known key");
    world
        .runtime()
        .block_on(async {
            harness
                .settings
                .save(&user, &UserSettings::default().with_updates([update]))
                .await
        })
        .expect("settings saved");
}

// -----------------------------------------------------------------------------
// When Steps
// -----------------------------------------------------------------------------

#[when("{login} uploads a {millis} ms run")]
fn uploads_a_run(world: &IngestionWorld, login: String, millis: u32) {
    let result = world.ingest(legacy(&login, millis).upload(&login));
    world.last_result.set(result);
}

#[when("{uploader} uploads a {millis} ms run by {login}")]
fn uploads_a_run_by(world: &IngestionWorld, uploader: String, millis: u32, login: String) {
    let result = world.ingest(legacy(&login, millis).upload(&uploader));
    world.last_result.set(result);
}

#[when("{uploader} re-uploads the previous file")]
fn re_uploads_the_previous_file(world: &IngestionWorld, uploader: String) {
    world.podium_before.set(world.podium());
    let previous = world.last_upload.get().expect("a previous upload");
    let result = world.ingest(ReplayUpload::new(
        previous.filename,
        previous.bytes,
        uploader,
    ));
    world.last_result.set(result);
}

#[when("{login} uploads a run under a filename naming {track}")]
fn uploads_under_another_filename(world: &IngestionWorld, login: String, track: String) {
    let upload = ReplayUpload::new(
        format!("{login}_{track}.Replay.Gbx"),
        legacy(&login, 30_000).build(),
        login,
    );
    let result = world.ingest(upload);
    world.last_result.set(result);
}

#[when("carol, dave and erin upload faster runs at the same time")]
fn upload_faster_runs_at_the_same_time(world: &IngestionWorld) {
    let harness = world.harness();
    world.runtime().block_on(async {
        let handles: Vec<_> = [("carol", 30_000), ("dave", 29_000), ("erin", 29_500)]
            .into_iter()
            .map(|(login, millis)| {
                let ingestion = Arc::clone(&harness.ingestion);
                let upload = legacy(login, millis).upload(login);
                tokio::spawn(async move { ingestion.ingest(&upload).await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("accepted");
        }
    });
}

// -----------------------------------------------------------------------------
// Then Steps
// -----------------------------------------------------------------------------

#[then("the trigger outcome is {outcome}")]
fn the_trigger_outcome_is(world: &IngestionWorld, outcome: String) {
    let trigger = world.last_ingested().trigger;
    match outcome.trim_matches('"') {
        "notified" => assert!(
            matches!(trigger, Some(TriggerOutcome::Notified { .. })),
            "{trigger:?}"
        ),
        // The hash tie-break may rank the earlier record first.
        "tied" => assert!(
            matches!(
                trigger,
                Some(TriggerOutcome::Tied | TriggerOutcome::NotLeader)
            ),
            "{trigger:?}"
        ),
        "not leader" => assert_eq!(trigger, Some(TriggerOutcome::NotLeader)),
        "self displacement" => assert_eq!(trigger, Some(TriggerOutcome::SelfDisplacement)),
        "opted out" => assert!(
            matches!(trigger, Some(TriggerOutcome::OptedOut { .. })),
            "{trigger:?}"
        ),
        other => panic!("unknown trigger outcome: {other}"),
    }
}

#[then("the upload is rejected as {kind}")]
fn the_upload_is_rejected_as(world: &IngestionWorld, kind: String) {
    let expected = match kind.trim_matches('"') {
        "a duplicate replay" => ErrorCode::DuplicateReplay,
        "a validation error" => ErrorCode::Validation,
        other => panic!("unknown rejection: {other}"),
    };
    assert_eq!(world.last_error().code(), expected);
}

#[then("the podium is unchanged")]
fn the_podium_is_unchanged(world: &IngestionWorld) {
    let before = world.podium_before.get().expect("podium captured");
    assert_eq!(world.podium(), before);
}

#[then("{login} was notified exactly once")]
fn was_notified_exactly_once(world: &IngestionWorld, login: String) {
    let targets = world.harness().dispatcher.targets();
    assert_eq!(
        targets.iter().filter(|target| **target == login).count(),
        1,
        "{targets:?}"
    );
}

#[then("only {login} was notified")]
fn only_was_notified(world: &IngestionWorld, login: String) {
    assert_eq!(world.harness().dispatcher.targets(), vec![login]);
}

#[then("nobody was notified")]
fn nobody_was_notified(world: &IngestionWorld) {
    assert!(world.harness().dispatcher.sent().is_empty());
}

#[then("no user was notified twice")]
fn no_user_was_notified_twice(world: &IngestionWorld) {
    let targets = world.harness().dispatcher.targets();
    let mut unique = targets.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), targets.len(), "duplicate notification: {targets:?}");
}

#[then("{login} is told the record fell from {old} to {new}")]
fn is_told_the_record_fell(world: &IngestionWorld, login: String, old: String, new: String) {
    let sent = world.harness().dispatcher.sent();
    let notification = sent
        .iter()
        .find(|notification| notification.target_user == login)
        .expect("notification for the displaced leader");
    assert_eq!(
        notification.message,
        format!(
            "Trackmania: Record broken on A01-Race\nOld time: {old}\nNew time: {new}\nby speedy"
        )
    );
}

#[then("no record exists for {track}")]
fn no_record_exists_for(world: &IngestionWorld, track: String) {
    let harness = world.harness();
    let best = world
        .runtime()
        .block_on(async { harness.leaderboard.best(&TrackId::new(track)).await })
        .expect("best");
    assert!(best.is_none());
}

#[then("the leaderboard lists no tracks")]
fn the_leaderboard_lists_no_tracks(world: &IngestionWorld) {
    let harness = world.harness();
    let standings = world
        .runtime()
        .block_on(async { harness.leaderboard.standings().await })
        .expect("standings");
    assert!(standings.is_empty());
}

#[then("{login} holds the best time")]
fn holds_the_best_time(world: &IngestionWorld, login: String) {
    let harness = world.harness();
    let best = world
        .runtime()
        .block_on(async { harness.leaderboard.best(&a01()).await })
        .expect("best");
    assert_eq!(best.map(|record| record.login), Some(login));
}

// -----------------------------------------------------------------------------
// Scenarios
// -----------------------------------------------------------------------------

#[scenario(
    path = "tests/features/replay_ingestion.feature",
    name = "A faster run notifies the displaced leader"
)]
fn a_faster_run_notifies_the_displaced_leader(world: IngestionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/replay_ingestion.feature",
    name = "A duplicate file leaves the podium unchanged"
)]
fn a_duplicate_file_leaves_the_podium_unchanged(world: IngestionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/replay_ingestion.feature",
    name = "A filename naming another track creates nothing"
)]
fn a_filename_naming_another_track_creates_nothing(world: IngestionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/replay_ingestion.feature",
    name = "Matching the leader's time sends nothing"
)]
fn matching_the_leaders_time_sends_nothing(world: IngestionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/replay_ingestion.feature",
    name = "A slower run sends nothing"
)]
fn a_slower_run_sends_nothing(world: IngestionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/replay_ingestion.feature",
    name = "Beating your own upload sends nothing"
)]
fn beating_your_own_upload_sends_nothing(world: IngestionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/replay_ingestion.feature",
    name = "A leader who opted out is not notified"
)]
fn a_leader_who_opted_out_is_not_notified(world: IngestionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/replay_ingestion.feature",
    name = "Concurrent overtakes notify each displaced leader once"
)]
fn concurrent_overtakes_notify_each_displaced_leader_once(world: IngestionWorld) {
    drop(world);
}
