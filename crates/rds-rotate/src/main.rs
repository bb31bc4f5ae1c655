//! rds-rotate: blue-green rotation of RDS instances and Aurora clusters
//!
//! Clones a source database into a dated replica, migrates it, points DNS at
//! it and retires yesterday's replica. State for each deployment lives in a
//! YAML document in S3 or a local directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rds_rotate::aws::{AwsContext, FromAwsContext, RdsClient, S3Client};
use rds_rotate::config::{AwsConfig, DnsApiConfig, PollingConfig, RotateConfig, StoreLocation};
use rds_rotate::dns::DnsimpleClient;
use rds_rotate::migrate::PostgresMigrator;
use rds_rotate::orchestrator::{
    NewDeployment, RotateOptions, RotationOutcome, Rotator, create_deployment, initial_document,
};
use rds_rotate::state::{LocalStateStore, S3StateStore, StateBackend, StateStore};
use rds_rotate_common::DnsConfig;
use rds_rotate_common::defaults::{
    DEFAULT_CLUSTER_MAX_ATTEMPTS, DEFAULT_DNS_TTL, DEFAULT_DNSIMPLE_BASE_URL,
    DEFAULT_INSTANCE_CLASS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REGION, DEFAULT_UTC_OFFSET_HOURS,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rds-rotate")]
#[command(about = "Blue-green rotation of RDS instances and Aurora clusters")]
#[command(version)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command
#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// AWS region
    #[arg(long, global = true, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long, global = true)]
    aws_profile: Option<String>,

    /// S3 bucket holding rotation documents
    #[arg(long, global = true, env = "AWS_S3_BUCKET_NAME")]
    bucket: Option<String>,

    /// Keep rotation documents in a local directory (takes precedence over --bucket)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Seconds between status polls
    #[arg(long, global = true, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval_secs: u64,

    /// Give up on a DB instance after this many polls (default: never)
    #[arg(long, global = true)]
    instance_max_attempts: Option<u32>,

    /// Give up on a DB cluster after this many polls
    #[arg(long, global = true, default_value_t = DEFAULT_CLUSTER_MAX_ATTEMPTS)]
    cluster_max_attempts: u32,

    /// Hours east of UTC used to date replica identifiers
    #[arg(long, global = true, default_value_t = DEFAULT_UTC_OFFSET_HOURS, allow_hyphen_values = true)]
    utc_offset_hours: i32,

    /// DNSimple API base URL
    #[arg(long, global = true, default_value = DEFAULT_DNSIMPLE_BASE_URL)]
    dnsimple_base_url: String,
}

/// Arguments for the new command (extracted to reduce enum size)
#[derive(clap::Args, Debug)]
struct NewArgs {
    /// Deployment name
    name: String,

    /// DB instance to clone from
    #[arg(long, conflicts_with = "source_cluster_identifier", requires = "target_base_identifier")]
    source_identifier: Option<String>,

    /// Stem for dated DB instance identifiers
    #[arg(long)]
    target_base_identifier: Option<String>,

    /// Aurora cluster to clone from
    #[arg(long, requires = "target_cluster_base_identifier")]
    source_cluster_identifier: Option<String>,

    /// Stem for dated cluster identifiers
    #[arg(long)]
    target_cluster_base_identifier: Option<String>,

    /// Instance class for clones (and cluster members)
    #[arg(long, default_value = DEFAULT_INSTANCE_CLASS)]
    instance_class: String,

    #[arg(long, default_value = "")]
    availability_zone: String,

    #[arg(long, default_value = "")]
    subnet_group: String,

    #[arg(long)]
    publicly_accessible: bool,

    /// Comma-separated VPC security group IDs
    #[arg(long, value_delimiter = ',')]
    security_group_ids: Vec<String>,

    /// Tag applied to every clone, as key=value (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,

    /// Master password set on every clone
    #[arg(long, env = "RDS_ROTATE_MASTER_PASSWORD", hide_env_values = true, default_value = "")]
    master_password: String,

    /// SQL statement run on every fresh clone (repeatable, in order)
    #[arg(long = "migration-query")]
    migration_queries: Vec<String>,

    #[arg(long, env = "DNSIMPLE_AUTH_TOKEN", hide_env_values = true, default_value = "")]
    dnsimple_auth_token: String,

    #[arg(long, default_value = "")]
    dnsimple_account_id: String,

    #[arg(long, default_value = "")]
    dnsimple_domain: String,

    #[arg(long, default_value = "")]
    dnsimple_record_name: String,

    #[arg(long, default_value_t = DEFAULT_DNS_TTL)]
    dnsimple_record_ttl: u32,

    /// Overwrite an existing deployment
    #[arg(long)]
    force: bool,
}

impl From<&NewArgs> for NewDeployment {
    fn from(args: &NewArgs) -> Self {
        Self {
            source_identifier: args.source_identifier.clone().unwrap_or_default(),
            target_base_identifier: args.target_base_identifier.clone().unwrap_or_default(),
            source_cluster_identifier: args.source_cluster_identifier.clone().unwrap_or_default(),
            target_cluster_base_identifier: args
                .target_cluster_base_identifier
                .clone()
                .unwrap_or_default(),
            instance_class: args.instance_class.clone(),
            availability_zone: args.availability_zone.clone(),
            subnet_group: args.subnet_group.clone(),
            publicly_accessible: args.publicly_accessible,
            security_group_ids: args
                .security_group_ids
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            tags: args.tags.iter().cloned().collect::<BTreeMap<_, _>>(),
            master_password: args.master_password.clone(),
            dns_config: DnsConfig {
                auth_token: args.dnsimple_auth_token.clone(),
                account_id: args.dnsimple_account_id.clone(),
                domain: args.dnsimple_domain.clone(),
                record_name: args.dnsimple_record_name.clone(),
                ttl: args.dnsimple_record_ttl,
            },
            migration_queries: args.migration_queries.clone(),
        }
    }
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("tag key cannot be empty in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a deployment's rotation document
    New(Box<NewArgs>),

    /// Clone a fresh replica, repoint DNS and retire yesterday's
    Rotate {
        /// Deployment name
        name: String,

        /// Bring the previous replica back instead of cloning a new one
        #[arg(long)]
        rollback: bool,

        /// Reuse a clone left by an interrupted run instead of recreating it
        #[arg(long)]
        resume: bool,
    },

    /// Shorthand for `rotate --rollback`
    Rollback {
        /// Deployment name
        name: String,
    },

    /// Print a deployment's rotation document with secrets masked
    Show {
        /// Deployment name
        name: String,
    },
}

impl TryFrom<&GlobalArgs> for RotateConfig {
    type Error = anyhow::Error;

    fn try_from(args: &GlobalArgs) -> Result<Self> {
        let store = match (&args.state_dir, &args.bucket) {
            (Some(dir), _) => StoreLocation::Local { dir: dir.clone() },
            (None, Some(bucket)) => StoreLocation::S3 {
                bucket: bucket.clone(),
            },
            (None, None) => return Err(rds_rotate::config::ConfigError::MissingStore.into()),
        };

        let config = Self {
            aws: AwsConfig {
                region: args.region.clone(),
                aws_profile: args.aws_profile.clone(),
            },
            store,
            polling: PollingConfig {
                interval_secs: args.poll_interval_secs,
                instance_max_attempts: args.instance_max_attempts,
                cluster_max_attempts: args.cluster_max_attempts,
            },
            dns: DnsApiConfig {
                base_url: args.dnsimple_base_url.clone(),
            },
            utc_offset_hours: args.utc_offset_hours,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;
    let mut stderr = std::io::stderr();

    // Print main error message
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    // Print error chain (causes)
    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = rds_rotate::aws::classify_anyhow_error(e).suggestion() {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {hint}");
    }

    // Only print backtrace hint if not already showing
    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

fn init_tracing() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into())
        .add_directive("aws_config=warn".parse()?)
        .add_directive("aws_smithy_runtime=warn".parse()?)
        .add_directive("aws_sdk_rds=warn".parse()?);

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let config = RotateConfig::try_from(&args.global)?;
    if let Some(profile) = config.aws_profile() {
        info!(profile = %profile, "Using AWS profile");
    }

    let aws = AwsContext::with_profile(config.region(), config.aws_profile()).await;
    let store = match &config.store {
        StoreLocation::S3 { bucket } => {
            StateBackend::S3(S3StateStore::new(S3Client::from_context(&aws), bucket.clone()))
        }
        StoreLocation::Local { dir } => StateBackend::Local(LocalStateStore::new(dir.clone())),
    };

    match args.command {
        Command::New(new_args) => {
            let (state, source) = initial_document(NewDeployment::from(new_args.as_ref()))?;
            info!(
                deployment = %new_args.name,
                kind = %source.kind,
                source = %source.source_identifier,
                location = %store.location(&new_args.name),
                "Creating deployment"
            );
            create_deployment(&store, &new_args.name, &state, new_args.force).await?;
        }
        Command::Rotate {
            name,
            rollback,
            resume,
        } => {
            let outcome = rotate(&config, &aws, store, &name, RotateOptions { rollback, resume }).await?;
            print_outcome(&outcome);
        }
        Command::Rollback { name } => {
            let options = RotateOptions {
                rollback: true,
                resume: false,
            };
            let outcome = rotate(&config, &aws, store, &name, options).await?;
            print_outcome(&outcome);
        }
        Command::Show { name } => {
            let state = store
                .load(&name)
                .await
                .with_context(|| format!("Failed to load {}", store.location(&name)))?;
            print!("{}", state.redacted().to_yaml()?);
        }
    }

    Ok(())
}

async fn rotate(
    config: &RotateConfig,
    aws: &AwsContext,
    store: StateBackend,
    name: &str,
    options: RotateOptions,
) -> Result<RotationOutcome> {
    let rotator = Rotator::new(
        RdsClient::from_context(aws),
        store,
        DnsimpleClient::new(config.dns.base_url.clone())?,
        PostgresMigrator::default(),
    )
    .with_clock(config.clock()?)
    .with_waits(config.polling.wait_settings());

    rotator.rotate(name, options).await
}

fn print_outcome(outcome: &RotationOutcome) {
    println!("deployment: {}", outcome.deployment);
    println!("kind:       {}", outcome.kind);
    println!("current:    {}", outcome.slots.current.instance_identifier);
    println!("previous:   {}", outcome.slots.previous.instance_identifier);
    println!("endpoint:   {}", outcome.endpoint);
    println!("rollback:   {}", outcome.rollback);
    println!("migrations: {}", outcome.migrations_applied);
    println!("dns:        {}", if outcome.dns_updated { "updated" } else { "skipped" });
    println!("retired:    {}", outcome.retired);
}
