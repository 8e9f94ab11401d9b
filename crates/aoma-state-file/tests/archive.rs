use aoma_state_file::{ArchiveError, ArchiveManager, OutputLayout};
use pretty_assertions::assert_eq;
use std::path::Path;

async fn write_reports(root: &Path, names: &[&str]) {
    let reports = OutputLayout::new(root).reports_dir();
    tokio::fs::create_dir_all(&reports).await.unwrap();
    for name in names {
        tokio::fs::write(reports.join(name), "{}").await.unwrap();
    }
}

#[tokio::test]
async fn archiving_moves_reports_aside() {
    let dir = tempfile::tempdir().unwrap();
    write_reports(
        dir.path(),
        &[
            "market_size_result_20250101_000000.json",
            "adas_report_20250101_000000.md",
            "notes.txt",
        ],
    )
    .await;
    let manager = ArchiveManager::new(dir.path());

    let folder = manager
        .archive_previous_run(Some("20250101_000000"))
        .await
        .unwrap()
        .unwrap();

    assert!(folder.ends_with("archives/run_20250101_000000"));
    let info = manager.archive_info("run_20250101_000000").await.unwrap().unwrap();
    assert_eq!(info.reports_count, 1);
    assert_eq!(info.rendered_count, 1);
    assert_eq!(info.total_files, 2);

    // Only archived extensions leave the reports folder
    let reports = OutputLayout::new(dir.path()).reports_dir();
    assert!(reports.join("notes.txt").exists());
    assert!(!reports.join("market_size_result_20250101_000000.json").exists());
}

#[tokio::test]
async fn nothing_to_archive_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ArchiveManager::new(dir.path());

    assert!(manager.archive_previous_run(None).await.unwrap().is_none());
    assert!(manager.list_archives().await.unwrap().is_empty());
}

#[tokio::test]
async fn cleaning_keeps_the_newest_archives() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ArchiveManager::new(dir.path());
    for stamp in ["20250103_000000", "20250101_000000", "20250102_000000"] {
        write_reports(dir.path(), &["market_size_result.json"]).await;
        manager.archive_previous_run(Some(stamp)).await.unwrap();
    }

    let deleted = manager.clean_old_archives(2).await.unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(
        manager.list_archives().await.unwrap(),
        vec!["run_20250102_000000".to_string(), "run_20250103_000000".to_string()]
    );
    assert_eq!(manager.clean_old_archives(5).await.unwrap(), 0);
}

#[tokio::test]
async fn archive_info_rejects_paths() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ArchiveManager::new(dir.path());

    for name in ["../runs", "run_1/../../etc", "reports"] {
        let err = manager.archive_info(name).await.unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidName(_)), "{}", name);
    }
    assert!(manager.archive_info("run_20990101_000000").await.unwrap().is_none());
}
