//! `credsource`: apply credential input source requests against a
//! controller.
//!
//! ```text
//! credsource apply --target prod-ssh --field password --source cyberark \
//!     --organization Default --metadata object_query=Safe=X;Object=Y
//! credsource apply --request request.json
//! credsource check-source --source cyberark
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr (`RUST_LOG`, default
//! `warn`).

mod report;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use credsource_models::{CredentialRef, DesiredState, InputSourceRequest, OrganizationRef};
use credsource_sdk::{ControllerClient, ControllerConfig, InputSourceManager, SdkError};
use serde_json::{json, Value};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "credsource")]
#[command(author, version, about = "Manage credential input sources", long_about = None)]
struct Cli {
    /// Controller base URL (overrides CONTROLLER_HOST and the config file)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Converge one input source to the desired state
    Apply(ApplyArgs),
    /// Check whether a credential can act as a lookup source
    CheckSource(CheckSourceArgs),
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// JSON request file (`-` for stdin) instead of the flags below
    #[arg(long, conflicts_with_all = ["target", "field", "source", "organization", "metadata", "state"])]
    request: Option<PathBuf>,

    /// Target credential (id or name)
    #[arg(long, required_unless_present = "request")]
    target: Option<CredentialRef>,

    /// Field of the target credential to populate
    #[arg(long, required_unless_present = "request")]
    field: Option<String>,

    /// Source credential (id or name); required unless --state absent
    #[arg(long)]
    source: Option<CredentialRef>,

    /// Organization scoping name references
    #[arg(long)]
    organization: Option<OrganizationRef>,

    /// Metadata entry, repeatable
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_metadata)]
    metadata: Vec<(String, String)>,

    /// Desired state: present, exists or absent
    #[arg(long, default_value_t = DesiredState::Present)]
    state: DesiredState,

    /// Report what would change without changing anything
    #[arg(long)]
    check: bool,
}

#[derive(Args, Debug)]
struct CheckSourceArgs {
    /// Credential to check (id or name)
    #[arg(long)]
    source: CredentialRef,

    /// Organization scoping a name reference
    #[arg(long)]
    organization: Option<OrganizationRef>,
}

fn parse_metadata(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{value}`")),
    }
}

impl ApplyArgs {
    fn into_request(self) -> anyhow::Result<InputSourceRequest> {
        if let Some(path) = &self.request {
            let mut request = read_request(path)?;
            request.check_mode |= self.check;
            request.validate().map_err(SdkError::from)?;
            return Ok(request);
        }

        let (Some(target), Some(field)) = (self.target, self.field) else {
            anyhow::bail!("--target and --field are required without --request");
        };
        let mut builder = InputSourceRequest::builder(target, field)
            .state(self.state)
            .check_mode(self.check);
        if let Some(source) = self.source {
            builder = builder.source(source);
        }
        if let Some(org) = self.organization {
            builder = builder.organization(org);
        }
        for (key, value) in self.metadata {
            builder = builder.metadata(key, value);
        }
        Ok(builder.build().map_err(SdkError::from)?)
    }
}

fn read_request(path: &Path) -> anyhow::Result<InputSourceRequest> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read request from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {}", path.display()))?
    };
    serde_json::from_str(&text).context("invalid request JSON")
}

async fn manager(
    host: Option<&str>,
    timeout: Option<u64>,
) -> anyhow::Result<InputSourceManager<ControllerClient, ControllerClient>> {
    let mut config = ControllerConfig::load()?;
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(secs) = timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    debug!(host = %config.host, timeout = ?config.timeout, "controller configured");

    let client = ControllerClient::new(&config)?;
    let manager = InputSourceManager::from_backend(client)
        .await
        .with_context(|| format!("controller {}", config.host))?;
    Ok(manager)
}

async fn run(cli: Cli) -> anyhow::Result<Value> {
    match cli.command {
        Commands::Apply(args) => {
            let request = args.into_request()?;
            let manager = manager(cli.host.as_deref(), cli.timeout).await?;
            let response = manager.apply(&request).await?;
            Ok(serde_json::to_value(response)?)
        }
        Commands::CheckSource(args) => {
            let reference = args
                .source
                .with_default_organization(args.organization.as_ref());
            let manager = manager(cli.host.as_deref(), cli.timeout).await?;
            let credential = manager.check_source(&reference).await?;
            Ok(json!({
                "supported": true,
                "id": credential.id,
                "name": credential.name,
                "credential_type": credential.credential_type,
            }))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs on stderr; stdout carries the JSON result only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let (report, code) = report::failure(&err);
            println!("{report:#}");
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn apply_flags_build_a_request() {
        let cli = Cli::try_parse_from([
            "credsource",
            "--host",
            "http://ctl:8013",
            "apply",
            "--target",
            "prod-ssh",
            "--field",
            "password",
            "--source",
            "12",
            "--organization",
            "Default",
            "--metadata",
            "object_query=Safe=X;Object=Y",
            "--metadata",
            "object_query_format=Exact",
            "--check",
        ])
        .expect("parse");
        assert_eq!(cli.host.as_deref(), Some("http://ctl:8013"));
        let Commands::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        let request = args.into_request().expect("request");
        assert_eq!(request.target_credential, CredentialRef::name("prod-ssh"));
        let source = request.source_credential.as_ref().expect("source");
        assert_eq!(source, &CredentialRef::name("12"));
        assert_eq!(source.id_candidate(), Some(credsource_models::CredentialId::new(12)));
        assert_eq!(request.metadata["object_query"], "Safe=X;Object=Y");
        assert_eq!(request.state, DesiredState::Present);
        assert!(request.check_mode);
    }

    #[test]
    fn absent_needs_no_source() {
        let cli = Cli::try_parse_from([
            "credsource", "apply", "--target", "3", "--field", "password", "--state", "absent",
        ])
        .expect("parse");
        let Commands::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.into_request().expect("request").state, DesiredState::Absent);
    }

    #[test]
    fn present_without_source_is_a_validation_failure() {
        let cli = Cli::try_parse_from(["credsource", "apply", "--target", "3", "--field", "password"])
            .expect("parse");
        let Commands::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        let err = args.into_request().expect_err("missing source");
        assert_eq!(report::kind_of(&err), credsource_sdk::ErrorKind::Validation);
    }

    #[test]
    fn request_file_conflicts_with_flags() {
        let parsed = Cli::try_parse_from([
            "credsource", "apply", "--request", "r.json", "--target", "x",
        ]);
        assert!(parsed.is_err());
        assert!(Cli::try_parse_from(["credsource", "apply", "--request", "r.json"]).is_ok());
    }

    #[test]
    fn blank_reference_is_rejected() {
        assert!(Cli::try_parse_from([
            "credsource", "apply", "--target", " ", "--field", "password", "--state", "absent",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["credsource", "check-source", "--source", ""]).is_err());
    }

    #[test]
    fn bad_metadata_and_state_are_rejected() {
        assert!(parse_metadata("novalue").is_err());
        assert!(parse_metadata("=x").is_err());
        assert_eq!(parse_metadata("k=").unwrap(), ("k".into(), String::new()));
        assert!(Cli::try_parse_from([
            "credsource", "apply", "--target", "x", "--field", "f", "--state", "gone",
        ])
        .is_err());
    }

    #[test]
    fn request_file_is_read() {
        let path = std::env::temp_dir().join(format!("credsource-request-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"target_credential": "prod-ssh", "input_field_name": "password", "state": "absent"}"#,
        )
        .expect("write");
        let request = read_request(&path).expect("read");
        assert_eq!(request.state, DesiredState::Absent);
        std::fs::remove_file(&path).expect("cleanup");
    }
}
