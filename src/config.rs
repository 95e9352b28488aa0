// src/config.rs
use crate::constants::{
    MAX_CONSECUTIVE_POLL_ERRORS, MAX_POLL_COUNT, POLL_INTERVAL_MS, UPSTREAM_CONNECT_TIMEOUT_SECS,
    UPSTREAM_MAX_PAGES, UPSTREAM_REQUEST_TIMEOUT_SECS,
};
use crate::error::AppError;
use crate::model::DatasetDefinition;
use crate::polling::PollSettings;
use crate::store::FileExecutionStore;
use crate::types::{
    AccessToken, ApiVersion, AuthScheme, DatasetId, ExecutionId, SourceCredentials, StoreDomain,
    ValidationError,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    #[command(subcommand)]
    pub command: CommandInput,

    /// Directory holding execution records (defaults to the user data dir)
    #[arg(long, global = true)]
    pub store_dir: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Status reads before giving up on a run
    #[arg(long, global = true, default_value_t = MAX_POLL_COUNT)]
    pub max_polls: u32,

    /// Milliseconds between status reads
    #[arg(long, global = true, default_value_t = POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Maximum primary pages fetched in one run
    #[arg(long, global = true, default_value_t = UPSTREAM_MAX_PAGES)]
    pub max_pages: u32,
}

#[derive(Subcommand, Debug)]
pub enum CommandInput {
    /// Start an extraction for a dataset definition and wait for it
    Run {
        /// Path to the dataset definition (JSON)
        definition: String,
        /// Write the extracted records to this file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show the status of one execution
    Status {
        execution_id: String,
        /// Include the extracted records (null until completed)
        #[arg(long)]
        data: bool,
    },
    /// Show the most recent execution of a dataset
    Latest {
        dataset_id: String,
        /// Include the extracted records (null until completed)
        #[arg(long)]
        data: bool,
    },
    /// Start a fresh execution for a failed one's dataset
    Retry {
        execution_id: String,
        /// Path to the dataset definition (JSON)
        #[arg(long)]
        definition: String,
        /// Write the extracted records to this file
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// A command with its arguments parsed and validated.
#[derive(Debug, Clone)]
pub enum Command {
    Run {
        definition: DatasetDefinition,
        output: Option<PathBuf>,
    },
    Status {
        execution_id: ExecutionId,
        include_data: bool,
    },
    Latest {
        dataset_id: DatasetId,
        include_data: bool,
    },
    Retry {
        execution_id: ExecutionId,
        definition: DatasetDefinition,
        output: Option<PathBuf>,
    },
}

/// Knobs for talking to the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSettings {
    pub max_pages: u32,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_pages: UPSTREAM_MAX_PAGES,
            connect_timeout_secs: UPSTREAM_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: UPSTREAM_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Resolved configuration, validated and ready to drive a command.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub command: Command,
    pub store_dir: PathBuf,
    pub verbose: bool,
    /// `None` when the environment names no source; runs then fail to start.
    pub credentials: Option<SourceCredentials>,
    pub extraction: ExtractionSettings,
    pub polling: PollSettings,
}

impl RunConfig {
    /// Resolves a complete configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let command = match cli.command {
            CommandInput::Run { definition, output } => Command::Run {
                definition: DatasetDefinition::from_json_file(&PathBuf::from(definition))?,
                output: output.map(PathBuf::from),
            },
            CommandInput::Status { execution_id, data } => Command::Status {
                execution_id: ExecutionId::parse(&execution_id)?,
                include_data: data,
            },
            CommandInput::Latest { dataset_id, data } => Command::Latest {
                dataset_id: DatasetId::parse(&dataset_id)?,
                include_data: data,
            },
            CommandInput::Retry {
                execution_id,
                definition,
                output,
            } => Command::Retry {
                execution_id: ExecutionId::parse(&execution_id)?,
                definition: DatasetDefinition::from_json_file(&PathBuf::from(definition))?,
                output: output.map(PathBuf::from),
            },
        };

        Ok(RunConfig {
            command,
            store_dir: cli
                .store_dir
                .map(PathBuf::from)
                .unwrap_or_else(FileExecutionStore::default_dir),
            verbose: cli.verbose,
            credentials: credentials_from_env(|key| std::env::var(key).ok())?,
            extraction: ExtractionSettings {
                max_pages: cli.max_pages,
                ..ExtractionSettings::default()
            },
            polling: PollSettings {
                max_poll_count: cli.max_polls.max(1),
                interval: Duration::from_millis(cli.poll_interval_ms),
                max_consecutive_errors: MAX_CONSECUTIVE_POLL_ERRORS,
            },
        })
    }
}

/// Reads source credentials from `UPSTREAM_*` variables.
///
/// Absent store domain or token yields `Ok(None)`; present but invalid
/// values are an error.
pub fn credentials_from_env(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<SourceCredentials>, AppError> {
    let (Some(domain), Some(token)) = (
        lookup("UPSTREAM_STORE_DOMAIN"),
        lookup("UPSTREAM_ACCESS_TOKEN"),
    ) else {
        log::debug!("UPSTREAM_STORE_DOMAIN / UPSTREAM_ACCESS_TOKEN not set");
        return Ok(None);
    };

    let mut credentials =
        SourceCredentials::new(StoreDomain::new(domain)?, AccessToken::new(token)?);

    if let Some(version) = lookup("UPSTREAM_API_VERSION") {
        credentials.api_version = ApiVersion::new(version)?;
    }
    if let Some(scheme) = lookup("UPSTREAM_AUTH_SCHEME") {
        credentials.auth_scheme = AuthScheme::parse(&scheme)?;
    }
    if let Some(endpoint) = lookup("UPSTREAM_ENDPOINT") {
        let url = Url::parse(&endpoint).map_err(|e| ValidationError::InvalidUrl {
            url: endpoint.clone(),
            reason: e.to_string(),
        })?;
        credentials.endpoint_override = Some(url);
    }

    Ok(Some(credentials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_credentials_absent() {
        assert!(credentials_from_env(env(&[])).unwrap().is_none());
        assert!(credentials_from_env(env(&[("UPSTREAM_STORE_DOMAIN", "a.test")]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_credentials_from_env() {
        let creds = credentials_from_env(env(&[
            ("UPSTREAM_STORE_DOMAIN", "acme.myshopify.com"),
            ("UPSTREAM_ACCESS_TOKEN", "shpat_abc"),
            ("UPSTREAM_API_VERSION", "2024-04"),
            ("UPSTREAM_AUTH_SCHEME", "bearer"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(creds.api_version.as_str(), "2024-04");
        assert_eq!(creds.auth_scheme, AuthScheme::Bearer);
        assert_eq!(
            creds.endpoint().unwrap().as_str(),
            "https://acme.myshopify.com/admin/api/2024-04/graphql.json"
        );
    }

    #[test]
    fn test_invalid_env_values_are_errors() {
        let result = credentials_from_env(env(&[
            ("UPSTREAM_STORE_DOMAIN", "acme.myshopify.com"),
            ("UPSTREAM_ACCESS_TOKEN", "shpat_abc"),
            ("UPSTREAM_API_VERSION", "latest"),
        ]));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = CommandLineInput::parse_from([
            "dataset-extractor",
            "status",
            "550e8400-e29b-41d4-a716-446655440000",
            "--max-polls",
            "5",
        ]);
        assert_eq!(cli.max_polls, 5);
        assert!(matches!(
            cli.command,
            CommandInput::Status { data: false, .. }
        ));

        let cli = CommandLineInput::parse_from([
            "dataset-extractor",
            "status",
            "550e8400-e29b-41d4-a716-446655440000",
            "--data",
        ]);
        assert!(matches!(cli.command, CommandInput::Status { data: true, .. }));

        let cli = CommandLineInput::parse_from(["dataset-extractor", "latest", "orders", "--data"]);
        assert!(matches!(cli.command, CommandInput::Latest { data: true, .. }));
    }
}
