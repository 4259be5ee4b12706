//! Ingest replay files into an in-process leaderboard and print standings.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use replayboard::domain::ports::UserSettingsRepository;
use replayboard::domain::{
    FileReport, LeaderboardService, ReplayIngestionService, SettingUpdate, UserSettings,
    latest_season,
};
use replayboard::inbound::files::load_uploads;
use replayboard::outbound::dispatch::{ConfiguredDispatcher, DispatchSettings};
use replayboard::outbound::persistence::{
    InMemoryReplayRepository, InMemoryUserSettingsRepository,
};
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `ingest-replays` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ingest-replays",
    about = "Ingest replay files, notify displaced leaders, and print track standings",
    version
)]
struct CliArgs {
    /// Replay files or directories of replays.
    #[arg(value_name = "path", required = true)]
    paths: Vec<PathBuf>,
    /// Account recorded as the uploader of every file.
    #[arg(long, value_name = "user")]
    uploader: String,
    /// Also print how many tracks each player holds at this rank (1-10).
    #[arg(long, value_name = "rank")]
    rank: Option<usize>,
    /// Per-user setting applied before ingesting, as `user:key=true|false`.
    #[arg(long = "setting", value_name = "user:key=value", value_parser = parse_setting)]
    settings: Vec<(String, SettingUpdate)>,
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let dispatch = DispatchSettings::load_from_iter([OsString::from("ingest-replays")])
        .map_err(|error| io::Error::other(format!("load dispatch settings: {error}")))?;
    let dispatcher = ConfiguredDispatcher::from_settings(&dispatch).map_err(io::Error::other)?;

    let replays = Arc::new(InMemoryReplayRepository::new());
    let settings = Arc::new(InMemoryUserSettingsRepository::new());
    apply_settings(settings.as_ref(), args.settings).await?;

    let ingestion = ReplayIngestionService::new(
        Arc::clone(&replays),
        settings,
        Arc::new(dispatcher),
        Arc::new(DefaultClock),
    );
    let leaderboard = LeaderboardService::new(Arc::clone(&replays), Arc::new(DefaultClock));

    let mut uploads = Vec::new();
    for loaded in load_uploads(&args.paths, &args.uploader) {
        match loaded.upload {
            Ok(upload) => uploads.push(upload),
            Err(error) => println!("{}: unreadable: {error}", loaded.path.display()),
        }
    }
    for report in ingestion.ingest_batch(&uploads).await {
        println!("{}", describe(&report));
    }

    let standings = leaderboard
        .standings()
        .await
        .map_err(|error| io::Error::other(format!("read standings: {error}")))?;
    for standing in &standings {
        println!(
            "track={} best={} by {} {} age_days={}",
            standing.track.track_id,
            standing.best.display_time(),
            standing.best.canonical_login(),
            standing.percent_diff,
            standing.age_days,
        );
    }
    if let Some(season) = latest_season(standings.iter().map(|standing| &standing.track.track_id)) {
        println!("season={season}");
    }

    if let Some(rank) = args.rank {
        let distribution = leaderboard
            .rank_distribution(rank)
            .await
            .map_err(|error| io::Error::other(format!("rank distribution: {error}")))?;
        for entry in distribution {
            println!("rank={rank} login={} tracks={}", entry.login, entry.tracks);
        }
    }
    Ok(())
}

async fn apply_settings(
    repo: &InMemoryUserSettingsRepository,
    updates: Vec<(String, SettingUpdate)>,
) -> io::Result<()> {
    for (user, update) in updates {
        let current = repo
            .find_by_user(&user)
            .await
            .map_err(io::Error::other)?
            .unwrap_or_default();
        let next = UserSettings::with_updates(current, [update]);
        repo.save(&user, &next).await.map_err(io::Error::other)?;
    }
    Ok(())
}

fn describe(report: &FileReport) -> String {
    match &report.result {
        Ok(ingested) => format!(
            "{}: accepted {} on {} ({})",
            report.filename,
            ingested.record.display_time(),
            ingested.record.track_id,
            ingested.record.canonical_login(),
        ),
        Err(error) => format!("{}: rejected [{:?}] {error}", report.filename, error.code()),
    }
}

fn parse_setting(raw: &str) -> Result<(String, SettingUpdate), String> {
    let (user, assignment) = raw
        .split_once(':')
        .filter(|(user, _)| !user.is_empty())
        .ok_or_else(|| "setting must look like user:key=value".to_owned())?;
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| "setting must look like user:key=value".to_owned())?;
    let value = value
        .parse::<bool>()
        .map_err(|error| format!("setting value must be true or false: {error}"))?;
    let update = SettingUpdate::parse(key, value).map_err(|error| error.to_string())?;
    Ok((user.to_owned(), update))
}
