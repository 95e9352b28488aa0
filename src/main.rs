// src/main.rs
use anyhow::Context;
use clap::Parser;
use dataset_extractor::{
    Command, CommandLineInput, DatasetDefinition, ExecutionId, ExecutionOrchestrator,
    ExecutionPoller, ExecutionRecord, ExecutionStore, FileExecutionStore, PollState, RunConfig,
    StaticCatalog, UpstreamClient, UpstreamHttpClient,
};
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("dataset_extractor.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {M} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Everything a command needs, wired once from the resolved configuration.
struct Runtime {
    store: Arc<FileExecutionStore>,
    catalog: Arc<StaticCatalog>,
    orchestrator: ExecutionOrchestrator,
    poller: ExecutionPoller,
}

impl Runtime {
    async fn build(config: &RunConfig) -> anyhow::Result<Self> {
        let store = Arc::new(
            FileExecutionStore::open(&config.store_dir)
                .await
                .context("opening execution store")?,
        );
        let catalog = Arc::new(StaticCatalog::new(config.credentials.clone()));
        let transport = UpstreamHttpClient::new(&config.extraction)?;
        let client = UpstreamClient::new(Arc::new(transport), config.extraction.max_pages);
        let orchestrator = ExecutionOrchestrator::new(store.clone(), catalog.clone(), client);
        let poller = ExecutionPoller::new(store.clone(), config.polling.clone());

        Ok(Self {
            store,
            catalog,
            orchestrator,
            poller,
        })
    }

    /// Registers the definition, starts a run, and waits for it.
    async fn run(&self, definition: DatasetDefinition, output: Option<&Path>) -> anyhow::Result<()> {
        let dataset_id = definition.id.clone();
        self.catalog.register(definition);
        let id = self
            .orchestrator
            .trigger(&dataset_id)
            .await
            .with_context(|| format!("starting extraction for {}", dataset_id))?;
        println!("Started execution {}", id);
        self.wait(&id, output).await
    }

    async fn retry(
        &self,
        execution_id: &ExecutionId,
        definition: DatasetDefinition,
        output: Option<&Path>,
    ) -> anyhow::Result<()> {
        self.catalog.register(definition);
        let id = self
            .orchestrator
            .retry(execution_id)
            .await
            .with_context(|| format!("retrying execution {}", execution_id))?;
        println!("Started execution {} (retry of {})", id, execution_id);
        self.wait(&id, output).await
    }

    async fn wait(&self, id: &ExecutionId, output: Option<&Path>) -> anyhow::Result<()> {
        let final_state = self
            .poller
            .poll_until_terminal(id, |state| match state {
                PollState::InProgress { progress } => eprint!("\r⏳ {:>3}%", progress),
                PollState::Error { message } => eprintln!("\n⚠️  {}", message),
                _ => {}
            })
            .await;
        eprintln!();

        match final_state {
            PollState::Success { record } => {
                if let Some(path) = output {
                    write_records(&record, path)?;
                    println!(
                        "✓ {} records saved to {}",
                        record.row_count.unwrap_or(0),
                        path.display()
                    );
                }
                print_status(&record, false)
            }
            PollState::Failed { message, .. } => {
                anyhow::bail!("execution {} failed: {}", id, message)
            }
            PollState::TimedOut { polls } => anyhow::bail!(
                "execution {} still running after {} status reads; check it later with `status {}`",
                id,
                polls,
                id
            ),
            PollState::Error { message } => {
                anyhow::bail!("cannot read status of execution {}: {}", id, message)
            }
            PollState::Loading | PollState::InProgress { .. } => {
                anyhow::bail!("execution {} ended polling without a final state", id)
            }
        }
    }
}

fn write_records(record: &ExecutionRecord, path: &Path) -> anyhow::Result<()> {
    let rows = record.data.as_deref().unwrap_or_default();
    let content = serde_json::to_string_pretty(rows)?;
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn print_status(record: &ExecutionRecord, include_data: bool) -> anyhow::Result<()> {
    let report = record.status_report(include_data)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn execute(config: RunConfig) -> anyhow::Result<()> {
    let runtime = Runtime::build(&config).await?;

    match config.command {
        Command::Run { definition, output } => runtime.run(definition, output.as_deref()).await,
        Command::Retry {
            execution_id,
            definition,
            output,
        } => {
            runtime
                .retry(&execution_id, definition, output.as_deref())
                .await
        }
        Command::Status {
            execution_id,
            include_data,
        } => {
            let record = runtime.store.get(&execution_id).await?;
            print_status(&record, include_data)
        }
        Command::Latest {
            dataset_id,
            include_data,
        } => {
            match runtime.store.latest_for_dataset(&dataset_id).await? {
                Some(record) => print_status(&record, include_data),
                None => {
                    println!("No executions yet for {}", dataset_id);
                    Ok(())
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).context("initializing logging")?;

    let config = RunConfig::resolve(cli)?;

    execute(config).await
}
