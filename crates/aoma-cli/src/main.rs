use anyhow::{Context, Result};
use aoma_cli::{App, Cli, Command, PipelineConfig};
use aoma_core::CancellationHandle;
use aoma_monitoring::{init_logging, LogExt};
use clap::Parser;
use tracing::warn;

/// Cancel the run between steps on Ctrl-C
fn cancel_on_interrupt() -> CancellationHandle {
    let cancellation = CancellationHandle::new();
    let handle = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current step");
            handle.cancel();
        }
    });
    cancellation
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (config, warnings) = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.monitoring_config()).context("Failed to initialize logging")?;
    config.log_loaded(&warnings);

    let app = App::new(config, cli.offline).context("Failed to build the pipeline")?;

    match cli.command {
        Command::Run(args) => {
            let outcome = app
                .run(&args, cancel_on_interrupt())
                .await
                .log_err("Run aborted")
                .context("Run aborted")?;
            print!("{}", outcome.summary());
        }
        Command::Step { step_id } => {
            let run = app
                .run_step(&step_id, cancel_on_interrupt())
                .await
                .with_context(|| format!("Step run for {} aborted", step_id))?;
            let result = run
                .completed_steps
                .get(&aoma_core::StepId::new(step_id.as_str()))
                .with_context(|| format!("No result for {}", step_id))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Steps => {
            print!("{}", app.describe_steps()?);
        }
        Command::Runs => {
            let runs = app.list_runs().await?;
            if runs.is_empty() {
                println!("No runs in {}", app.config().outputs_dir.display());
            }
            for run in runs {
                println!(
                    "{}  {:<16}  {}",
                    run.run_id,
                    run.status.as_str(),
                    run.started_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Command::Render { run_id } => {
            let path = app
                .render(&run_id)
                .await
                .with_context(|| format!("Failed to render run {}", run_id))?;
            if let Some(path) = path {
                println!("{}", path.display());
            }
        }
        Command::Archives => {
            for info in app.archives().await? {
                println!(
                    "{}  {} step results, {} reports",
                    info.name, info.reports_count, info.rendered_count
                );
            }
        }
    }

    Ok(())
}
