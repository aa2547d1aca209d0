//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mapfeed_core` linkage.
//! - Optionally run one feed load against a local database and print slots.
//!
//! Usage: `mapfeed_cli [<db-path> [<lat> <lng>]]`
//! `MAPFEED_CONFIG` names a JSON feed config; `MAPFEED_LOG_DIR` enables file logs.

use mapfeed_core::db::open_db;
use mapfeed_core::{
    FeedConfig, FeedEntry, FeedOrchestrator, FeedSlot, FeedState, LoadStatus, ReferenceLocation,
    SqliteCacheStore, SqliteRecordSource,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("mapfeed_core ping={}", mapfeed_core::ping());
    println!("mapfeed_core version={}", mapfeed_core::core_version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let db_path = &args[0];
    let location = match &args[1..] {
        [] => None,
        [lat, lng] => Some(ReferenceLocation {
            lat: parse_degrees("lat", lat)?,
            lng: parse_degrees("lng", lng)?,
            city: None,
        }),
        _ => return Err("expected `<db-path> [<lat> <lng>]`".to_string()),
    };

    if let Ok(log_dir) = std::env::var("MAPFEED_LOG_DIR") {
        mapfeed_core::init_logging(mapfeed_core::default_log_level(), &log_dir)?;
    }

    let config = match std::env::var("MAPFEED_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|err| format!("failed to read config `{path}`: {err}"))?;
            FeedConfig::from_json_str(&raw).map_err(|err| err.to_string())?
        }
        Err(_) => FeedConfig::default(),
    };

    let source_conn = open_db(db_path).map_err(|err| err.to_string())?;
    let cache_conn = open_db(db_path).map_err(|err| err.to_string())?;
    let orchestrator = FeedOrchestrator::new(
        SqliteRecordSource::new(source_conn),
        SqliteCacheStore::new(&cache_conn),
        config,
    );

    let state = futures::executor::block_on(orchestrator.load(location.as_ref()));
    print_state(&state, orchestrator.config());
    Ok(())
}

fn parse_degrees(name: &str, raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|err| format!("invalid {name} `{raw}`: {err}"))
}

fn print_state(state: &FeedState, config: &FeedConfig) {
    println!("main status={:?}", state.main.status);
    print_slot("main", state.slot(FeedSlot::Main));

    println!("endorsed status={:?}", state.endorsed.status);
    for index in 0..config.endorsed_display_count {
        print_slot(
            &format!("endorsed[{index}]"),
            state.slot(FeedSlot::Endorsed(index)),
        );
    }

    println!(
        "nearby status={:?} source={:?}",
        state.nearby.status, state.nearby_source
    );
    if state.nearby.status != LoadStatus::Disabled {
        if state.none_nearby() {
            println!("nearby none");
        }
        for index in 0..config.nearby_display_count {
            print_slot(&format!("nearby[{index}]"), state.slot(FeedSlot::Nearby(index)));
        }
    }

    for (name, list) in [("trending", &state.trending), ("recent", &state.recent)] {
        println!(
            "{name} status={:?} records={} has_more={}",
            list.status,
            list.records.len(),
            list.has_more()
        );
        for record in &list.records {
            println!("  {name} id={} title={}", record.id, record.title);
        }
    }
}

fn print_slot(label: &str, entry: Option<&FeedEntry>) {
    match entry {
        Some(FeedEntry::Record(record)) => println!(
            "  {label} id={} owner={} title={} endorsements={}",
            record.id,
            record.owner_id,
            record.title,
            record.endorsements()
        ),
        Some(FeedEntry::Snippet(snippet)) => {
            println!("  {label} id={} owner={} cached", snippet.id, snippet.owner_id)
        }
        None => println!("  {label} placeholder"),
    }
}
