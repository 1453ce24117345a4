use aimforge::clock::ManualClock;
use aimforge::engine::{build_engine, NullSurface, TickOutcome, TrainingResult};
use aimforge::history::{HistoryDb, HistoryStore, MemoryHistory, ResultSink, HISTORY_LIMIT};
use aimforge::session::{TrainingConfig, TrainingMode};
use aimforge::target::CanvasSize;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Plays a whole unattended run and returns its result.
fn idle_run(mode: TrainingMode, seed: u64) -> TrainingResult {
    let clock = ManualClock::new();
    let config = TrainingConfig {
        duration_secs: 1.0,
        ..TrainingConfig::default()
    };
    let mut engine = build_engine(
        mode,
        CanvasSize::new(800.0, 600.0),
        config,
        Box::new(clock.clone()),
        Box::new(StdRng::seed_from_u64(seed)),
    );
    engine.start();
    for _ in 0..1_000 {
        clock.advance(16.0);
        if engine.tick(&mut NullSurface) == TickOutcome::Finished {
            break;
        }
    }
    engine.results()
}

#[test]
fn results_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("history.db");

    let gridshot = idle_run(TrainingMode::Gridshot, 1);
    let tracking = idle_run(TrainingMode::Tracking, 2);
    {
        let mut db = HistoryDb::open(&path).unwrap();
        db.record(&gridshot).unwrap();
        db.record(&tracking).unwrap();
    }

    let db = HistoryDb::open(&path).unwrap();
    let recent = db.recent(10).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0], tracking);
    assert_eq!(recent[1], gridshot);

    // nobody clicked, so every gridshot target was a miss
    let summary = db.summary_for(TrainingMode::Gridshot).unwrap().unwrap();
    assert_eq!(summary.sessions, 1);
    assert_eq!(summary.best_score, 0);
    assert_eq!(summary.avg_accuracy, 0.0);
    assert!(db.summary_for(TrainingMode::Flicking).unwrap().is_none());
}

#[test]
fn database_and_memory_agree() {
    let mut db = HistoryDb::open_in_memory().unwrap();
    let mut memory = MemoryHistory::new();
    let stores: [&mut dyn HistoryStore; 2] = [&mut db, &mut memory];
    for store in stores {
        for (i, mode) in TrainingMode::ALL.into_iter().enumerate() {
            store.record(&idle_run(mode, i as u64)).unwrap();
        }
    }

    let from_db = HistoryStore::overall_summary(&db).unwrap().unwrap();
    let from_memory = HistoryStore::overall_summary(&memory).unwrap().unwrap();
    assert_eq!(from_db.sessions, 3);
    assert_eq!(from_db.sessions, from_memory.sessions);
    assert_eq!(from_db.total_score, from_memory.total_score);
    assert!((from_db.avg_accuracy - from_memory.avg_accuracy).abs() < 1e-9);
}

#[test]
fn only_the_latest_runs_are_kept() {
    let mut db = HistoryDb::open_in_memory().unwrap();
    let run = idle_run(TrainingMode::Flicking, 3);
    for _ in 0..HISTORY_LIMIT + 20 {
        db.record(&run).unwrap();
    }
    assert_eq!(db.len().unwrap(), HISTORY_LIMIT);
}

#[test]
fn export_lists_every_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = HistoryDb::open_in_memory().unwrap();
    db.record(&idle_run(TrainingMode::Gridshot, 4)).unwrap();
    db.record(&idle_run(TrainingMode::Flicking, 5)).unwrap();

    let csv_path = dir.path().join("history.csv");
    assert_eq!(db.export_csv(&csv_path).unwrap(), 2);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[1], "mode");
    let modes: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[1].to_string())
        .collect();
    assert_eq!(modes, vec!["flicking", "gridshot"]);
}
