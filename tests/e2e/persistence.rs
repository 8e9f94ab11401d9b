use aoma_core::{RunOrchestrator, RunRepository, StepExecutor};
use aoma_report::MarkdownReportRenderer;
use aoma_state_file::{ArchiveManager, FileRunRepository, OutputLayout};
use aoma_state_inmemory::InMemoryRunRepository;
use aoma_steps::adas_registry;
use aoma_tests::sample_scripted;
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn run_with(repository: Arc<dyn RunRepository>) -> anyhow::Result<aoma_core::Run> {
    let run = RunOrchestrator::new(Arc::new(adas_registry()?), StepExecutor::new(Arc::new(sample_scripted())))?
        .with_repository(repository)
        .start_run()
        .await?;
    Ok(run)
}

#[tokio::test]
async fn file_and_memory_repositories_agree() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let memory = Arc::new(InMemoryRunRepository::new());
    let files = Arc::new(FileRunRepository::new(dir.path()));

    let run = run_with(memory.clone()).await?;
    files.save(&run).await?;

    let from_memory = memory.find_by_id(&run.run_id).await?.unwrap();
    let from_files = files.find_by_id(&run.run_id).await?.unwrap();
    assert_eq!(from_memory.status, from_files.status);
    assert_eq!(from_memory.completed_steps, from_files.completed_steps);
    assert_eq!(from_memory.source_documents, from_files.source_documents);
    assert_eq!(memory.list_runs().await?, files.list_runs().await?);
    Ok(())
}

#[tokio::test]
async fn repeated_runs_rotate_archives() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = ArchiveManager::new(dir.path());
    let layout = OutputLayout::new(dir.path());

    for stamp in ["20250101_000000", "20250102_000000", "20250103_000000"] {
        manager.archive_previous_run(Some(stamp)).await?;
        manager.clean_old_archives(1).await?;
        RunOrchestrator::new(Arc::new(adas_registry()?), StepExecutor::new(Arc::new(sample_scripted())))?
            .with_repository(Arc::new(FileRunRepository::new(dir.path())))
            .with_renderer(Arc::new(MarkdownReportRenderer::new(dir.path())))
            .start_run()
            .await?;
    }

    // The first call had nothing to archive and the oldest archive was rotated out
    assert_eq!(manager.list_archives().await?, vec!["run_20250103_000000".to_string()]);
    let info = manager.archive_info("run_20250103_000000").await?.unwrap();
    assert_eq!(info.reports_count, 10);
    assert_eq!(info.rendered_count, 1);

    let mut current = tokio::fs::read_dir(layout.reports_dir()).await?;
    let mut count = 0;
    while current.next_entry().await?.is_some() {
        count += 1;
    }
    assert_eq!(count, 11);

    // Run records are never archived
    assert_eq!(FileRunRepository::new(dir.path()).list_runs().await?.len(), 3);
    Ok(())
}
