use super::*;
use crate::config::{SessionCompression, SessionConfig, SessionStorageMode};
use crate::draw::{BLACK, CanvasState, GREEN, Point};
use crate::input::Mode;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn canvas_with_strokes(count: usize) -> CanvasState {
    let mut canvas = CanvasState::new(640, 480, BLACK, 100);
    for i in 0..count {
        let y = 20 + i as i32 * 10;
        canvas
            .begin_stroke(Mode::Drawing, Point::new(10, y), GREEN, 3.0)
            .unwrap();
        canvas.extend_stroke(Point::new(60, y));
        canvas.extend_stroke(Point::new(110, y + 5));
        canvas.seal_stroke();
    }
    canvas
}

fn test_options(dir: &Path) -> SessionOptions {
    let mut options = SessionOptions::new(dir.to_path_buf());
    options.compression = CompressionMode::Off;
    options
}

fn session_names(dir: &Path) -> Vec<String> {
    list_session_files(dir)
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

#[test]
fn options_from_config_custom_storage() {
    let temp = tempfile::tempdir().unwrap();
    let custom_dir = temp.path().join("sessions");

    let mut cfg = SessionConfig::default();
    cfg.storage = SessionStorageMode::Custom;
    cfg.custom_directory = Some(custom_dir.to_string_lossy().to_string());
    cfg.history_limit = 3;
    cfg.compress = SessionCompression::On;

    let options = options_from_config(&cfg, temp.path()).unwrap();
    assert_eq!(options.base_dir, custom_dir);
    assert_eq!(options.history_limit, 3);
    assert_eq!(options.compression, CompressionMode::On);
    assert!(
        options
            .session_file_path("abc")
            .ends_with("sessions/autosave-abc.json")
    );
}

#[test]
fn options_from_config_config_storage_uses_config_dir() {
    let temp = tempfile::tempdir().unwrap();
    let mut cfg = SessionConfig::default();
    cfg.storage = SessionStorageMode::Config;

    let options = options_from_config(&cfg, temp.path()).unwrap();
    assert_eq!(options.base_dir, temp.path());
    assert_eq!(options.autosave_interval, Duration::from_secs(60));
    assert_eq!(options.history_limit, 5);
}

#[test]
fn custom_storage_without_directory_is_rejected() {
    let mut cfg = SessionConfig::default();
    cfg.storage = SessionStorageMode::Custom;
    cfg.custom_directory = None;

    let err = options_from_config(&cfg, Path::new("/tmp")).unwrap_err();
    assert!(err.to_string().contains("custom_directory"));
}

#[test]
fn saved_session_loads_back_with_same_strokes() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());
    let canvas = canvas_with_strokes(2);

    let saved = save_session(&canvas.snapshot(), &options).unwrap();
    assert!(!saved.compressed);
    assert_eq!(saved.evicted, 0);

    let loaded = load_session(&saved.path, &options).unwrap();
    assert_eq!(loaded.file.session_id, saved.session_id);
    assert_eq!(loaded.file.canvas.strokes, canvas.strokes());
    assert_eq!(loaded.file.canvas.width, 640);
    assert!(loaded.file.saved_at().is_some());
    assert!(!loaded.compressed);
}

#[test]
fn compressed_sessions_are_gzip_on_disk() {
    let temp = tempfile::tempdir().unwrap();
    let mut options = test_options(temp.path());
    options.compression = CompressionMode::On;

    let canvas = canvas_with_strokes(3);
    let saved = save_session(&canvas.snapshot(), &options).unwrap();
    assert!(saved.compressed);

    let raw = fs::read(&saved.path).unwrap();
    assert!(super::snapshot::is_gzip(&raw));

    let loaded = load_session(&saved.path, &options).unwrap();
    assert!(loaded.compressed);
    assert_eq!(loaded.file.canvas.strokes.len(), 3);
}

#[test]
fn auto_compression_follows_threshold() {
    let temp = tempfile::tempdir().unwrap();
    let mut options = test_options(temp.path());
    options.compression = CompressionMode::Auto;
    options.auto_compress_threshold_bytes = u64::MAX;

    let small = save_session(&canvas_with_strokes(1).snapshot(), &options).unwrap();
    assert!(!small.compressed);

    options.auto_compress_threshold_bytes = 1;
    let large = save_session(&canvas_with_strokes(1).snapshot(), &options).unwrap();
    assert!(large.compressed);
}

#[test]
fn history_keeps_only_newest_sessions() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());

    let mut saved = Vec::new();
    for count in 1..=7 {
        saved.push(save_session(&canvas_with_strokes(count).snapshot(), &options).unwrap());
    }

    let names = session_names(temp.path());
    assert_eq!(names.len(), 5);
    assert!(!saved[0].path.exists());
    assert!(!saved[1].path.exists());
    assert!(saved[6].path.exists());

    let latest = latest_session(&options).unwrap().unwrap();
    assert_eq!(latest.file.canvas.strokes.len(), 7);
}

#[test]
fn session_listing_ignores_unrelated_files() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("notes.json"), "{}").unwrap();
    fs::write(temp.path().join("autosave-x.json.tmp"), "{}").unwrap();
    fs::write(temp.path().join("sessions.lock"), "").unwrap();
    fs::write(temp.path().join("autosave-x.json"), "{}").unwrap();

    assert_eq!(session_names(temp.path()), vec!["autosave-x.json"]);
    assert!(list_session_files(&temp.path().join("missing")).unwrap().is_empty());
}

#[test]
fn latest_session_skips_corrupt_files() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());
    let good = save_session(&canvas_with_strokes(2).snapshot(), &options).unwrap();

    // Newer by name than anything save_session produces
    fs::write(
        temp.path().join("autosave-99990101T000000000Z-000.json"),
        "{\"version\": 1, \"session_id\": ",
    )
    .unwrap();
    fs::write(
        temp.path().join("autosave-99990101T000000000Z-001.json"),
        [0x1f, 0x8b, 0x08, 0x00],
    )
    .unwrap();

    let latest = latest_session(&options).unwrap().unwrap();
    assert_eq!(latest.path, good.path);
}

#[test]
fn unsupported_version_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());
    let saved = save_session(&canvas_with_strokes(1).snapshot(), &options).unwrap();

    let mut value: serde_json::Value =
        serde_json::from_slice(&fs::read(&saved.path).unwrap()).unwrap();
    value["version"] = serde_json::json!(42);
    fs::write(&saved.path, serde_json::to_vec(&value).unwrap()).unwrap();

    let err = load_session(&saved.path, &options).unwrap_err();
    assert!(format!("{:#}", err).contains("unsupported version"));
    assert!(latest_session(&options).unwrap().is_none());
}

#[test]
fn oversize_payload_is_not_written() {
    let temp = tempfile::tempdir().unwrap();
    let mut options = test_options(temp.path());
    options.max_file_size_bytes = 16;

    assert!(save_session(&canvas_with_strokes(2).snapshot(), &options).is_err());
    assert!(session_names(temp.path()).is_empty());
}

#[test]
fn stroke_limit_truncates_saved_canvas() {
    let temp = tempfile::tempdir().unwrap();
    let mut options = test_options(temp.path());
    options.max_strokes = 2;

    let saved = save_session(&canvas_with_strokes(4).snapshot(), &options).unwrap();
    let loaded = load_session(&saved.path, &options).unwrap();
    assert_eq!(loaded.file.canvas.strokes.len(), 2);
}

#[test]
fn run_marker_detects_unclean_shutdown() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());

    let first = RunMarker::acquire(&options).unwrap();
    assert!(!first.previous_run_unclean());
    assert!(options.marker_file_path().exists());
    // Simulate a crash: the marker is never released
    drop(first);

    let second = RunMarker::acquire(&options).unwrap();
    assert!(second.previous_run_unclean());
    second.release().unwrap();
    assert!(!options.marker_file_path().exists());

    let third = RunMarker::acquire(&options).unwrap();
    assert!(!third.previous_run_unclean());
}

#[test]
fn recovery_only_after_unclean_shutdown() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());
    save_session(&canvas_with_strokes(3).snapshot(), &options).unwrap();

    let clean = RunMarker::acquire(&options).unwrap();
    assert!(recovery_candidate(&options, &clean).unwrap().is_none());
    drop(clean);

    let after_crash = RunMarker::acquire(&options).unwrap();
    let loaded = recovery_candidate(&options, &after_crash).unwrap().unwrap();
    assert_eq!(loaded.file.canvas.strokes.len(), 3);

    let mut canvas = CanvasState::new(640, 480, BLACK, 100);
    canvas.restore(&loaded.file.canvas);
    assert_eq!(canvas.strokes().len(), 3);
}

#[test]
fn inspect_reports_files_and_corruption() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());
    save_session(&canvas_with_strokes(2).snapshot(), &options).unwrap();
    fs::write(
        temp.path().join("autosave-99990101T000000000Z-000.json"),
        "garbage",
    )
    .unwrap();
    let _marker = RunMarker::acquire(&options).unwrap();

    let inspection = inspect_sessions(&options).unwrap();
    assert_eq!(inspection.base_dir, temp.path());
    assert_eq!(inspection.files.len(), 2);
    assert!(inspection.marker_present);
    assert_eq!(inspection.files[0].stroke_count, Some(2));
    assert!(inspection.files[1].stroke_count.is_none());
    assert!(inspection.files[1].error.is_some());
    assert_eq!(
        inspection.newest_loadable().map(|f| f.path.clone()),
        Some(inspection.files[0].path.clone())
    );
}

#[test]
fn clear_sessions_removes_everything() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());
    save_session(&canvas_with_strokes(1).snapshot(), &options).unwrap();
    save_session(&canvas_with_strokes(2).snapshot(), &options).unwrap();
    let marker = RunMarker::acquire(&options).unwrap();
    drop(marker);

    let outcome = clear_sessions(&options).unwrap();
    assert_eq!(outcome.removed_sessions, 2);
    assert!(outcome.removed_lock);
    assert!(outcome.removed_marker);
    assert!(session_names(temp.path()).is_empty());

    let again = clear_sessions(&options).unwrap();
    assert_eq!(again.removed_sessions, 0);
    assert!(!again.removed_lock);
}

fn fast_options(dir: &Path) -> SessionOptions {
    let mut options = test_options(dir);
    options.autosave_interval = Duration::from_millis(50);
    options
}

#[tokio::test]
async fn autosave_persists_changed_canvas_on_interval() {
    let temp = tempfile::tempdir().unwrap();
    let options = fast_options(temp.path());
    let marker = RunMarker::acquire(&options).unwrap();
    let mut canvas = CanvasState::new(640, 480, BLACK, 100);

    let mut manager = SessionManager::start(
        &tokio::runtime::Handle::current(),
        options.clone(),
        Some(marker),
        &canvas,
    );
    assert!(!manager.publish(&canvas));

    canvas
        .begin_stroke(Mode::Drawing, Point::new(5, 5), GREEN, 3.0)
        .unwrap();
    canvas.extend_stroke(Point::new(50, 50));
    canvas.seal_stroke();
    assert!(manager.publish(&canvas));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let names = session_names(temp.path());
    assert_eq!(names.len(), 1);
    assert!(matches!(
        manager.status().await,
        SessionStatus::Saved { .. }
    ));

    // Unchanged revision does not produce further files
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session_names(temp.path()).len(), 1);

    manager.shutdown(Duration::from_secs(5)).await.unwrap();
    assert!(!options.marker_file_path().exists());
}

#[tokio::test]
async fn unchanged_canvas_is_not_saved() {
    let temp = tempfile::tempdir().unwrap();
    let options = fast_options(temp.path());
    let canvas = canvas_with_strokes(1);

    let manager = SessionManager::start(
        &tokio::runtime::Handle::current(),
        options,
        None,
        &canvas,
    );
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(session_names(temp.path()).is_empty());
    assert_eq!(manager.status().await, SessionStatus::Idle);
    manager.shutdown(Duration::from_secs(5)).await.unwrap();
    assert!(session_names(temp.path()).is_empty());
}

#[tokio::test]
async fn explicit_save_and_shutdown_flush() {
    let temp = tempfile::tempdir().unwrap();
    let mut options = test_options(temp.path());
    options.autosave_interval = Duration::from_secs(3600);
    let mut canvas = canvas_with_strokes(1);

    let mut manager = SessionManager::start(
        &tokio::runtime::Handle::current(),
        options,
        None,
        &canvas,
    );

    manager.request_save().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session_names(temp.path()).len(), 1);

    canvas.clear();
    manager.publish(&canvas);
    manager.shutdown(Duration::from_secs(5)).await.unwrap();

    let names = session_names(temp.path());
    assert_eq!(names.len(), 2);
    let latest = latest_session(&test_options(temp.path())).unwrap().unwrap();
    assert!(latest.file.canvas.strokes.is_empty());
}

#[tokio::test]
async fn write_failure_is_reported_and_retried() {
    let temp = tempfile::tempdir().unwrap();
    let blocker = temp.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();
    let options = fast_options(&PathBuf::from(&blocker));
    let mut canvas = CanvasState::new(640, 480, BLACK, 100);

    let mut manager = SessionManager::start(
        &tokio::runtime::Handle::current(),
        options,
        None,
        &canvas,
    );
    canvas
        .begin_stroke(Mode::Drawing, Point::new(1, 1), GREEN, 3.0)
        .unwrap();
    canvas.seal_stroke();
    manager.publish(&canvas);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(
        manager.status().await,
        SessionStatus::Failed(_)
    ));

    // Once the directory becomes writable the next tick succeeds
    fs::remove_file(&blocker).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(
        manager.status().await,
        SessionStatus::Saved { .. }
    ));
    manager.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn shutdown_releases_marker_even_without_waiting_for_the_save() {
    let temp = tempfile::tempdir().unwrap();
    let options = test_options(temp.path());
    let marker = RunMarker::acquire(&options).unwrap();
    let mut canvas = CanvasState::new(640, 480, BLACK, 100);

    let mut manager = SessionManager::start(
        &tokio::runtime::Handle::current(),
        options.clone(),
        Some(marker),
        &canvas,
    );
    canvas
        .begin_stroke(Mode::Drawing, Point::new(5, 5), GREEN, 3.0)
        .unwrap();
    canvas.seal_stroke();
    manager.publish(&canvas);

    manager.shutdown(Duration::ZERO).await.unwrap();
    assert!(!options.marker_file_path().exists());
}
