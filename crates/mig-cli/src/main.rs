//! `migctl`: plan, review and run cross-environment migrations
//!
//! ```text
//! migctl --config prod.toml plan agent_app support-bot
//! migctl --config prod.toml review tool web-search
//! migctl --config prod.toml migrate agent_app support-bot --overrides reviewed.json --wait
//! migctl --config prod.toml stage agent_app support-bot
//! migctl --config prod.toml import-staged staging/prod_agent_app_support-bot.json
//! ```

mod render;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use futures::future::join_all;
use mig_core::{EngineConfig, MigrationEngine, MigrationReport, MigrationRequest, ResourceOverride};
use mig_http::Environment;
use mig_types::{LineageDirection, ResourceKey, ResourceKind};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

fn resource_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("kind")
                .required(true)
                .value_parser(ResourceKind::from_str)
                .help("Resource kind, e.g. agent_app, tool, prompt"),
        )
        .arg(
            Arg::new("key")
                .required(true)
                .value_parser(ResourceKey::from_str)
                .help("Resource key in the source environment"),
        )
}

fn direction_arg() -> Arg {
    Arg::new("direction")
        .long("direction")
        .value_parser(LineageDirection::from_str)
        .help("Lineage walk direction, upstream or downstream (config default)")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn wait_arg() -> Arg {
    Arg::new("wait")
        .long("wait")
        .action(ArgAction::SetTrue)
        .help("Wait for deployment reconciliation to finish")
}

fn cli() -> Command {
    Command::new("migctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Migrate portal resources between environments")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration (TOML)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(resource_args(Command::new("plan").about("Show the migration plan")).arg(direction_arg()).arg(json_arg()))
        .subcommand(
            resource_args(Command::new("review").about("Show environment-specific fields against the target"))
                .arg(json_arg()),
        )
        .subcommand(
            resource_args(Command::new("migrate").about("Migrate a resource and its dependencies"))
                .arg(direction_arg())
                .arg(
                    Arg::new("no-deps")
                        .long("no-deps")
                        .action(ArgAction::SetTrue)
                        .help("Migrate the resource alone"),
                )
                .arg(
                    Arg::new("overrides")
                        .long("overrides")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file with reviewed production values"),
                )
                .arg(wait_arg())
                .arg(json_arg()),
        )
        .subcommand(
            resource_args(Command::new("stage").about("Write converted documents to the staging area"))
                .arg(direction_arg()),
        )
        .subcommand(
            Command::new("import-staged")
                .about("Import a merged staging file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Merged staging file"),
                )
                .arg(wait_arg())
                .arg(json_arg()),
        )
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        eprintln!("migctl: logging already initialised");
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn build_engine(config: EngineConfig) -> Result<MigrationEngine> {
    let source = Environment::connect(&config.source).context("source environment")?;
    let target = Environment::connect(&config.target).context("target environment")?;

    MigrationEngine::builder(config)
        .source(source.registry())
        .target(target.registry())
        .lineage(source.lineage())
        .policy(target.policy())
        .deployments(target.deployments())
        .build()
        .context("assembling migration engine")
}

fn load_overrides(path: &Path) -> Result<Vec<ResourceOverride>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing overrides in {}", path.display()))
}

fn resource(args: &ArgMatches) -> Result<(ResourceKind, ResourceKey)> {
    let kind = *args.get_one::<ResourceKind>("kind").context("missing kind")?;
    let key = args.get_one::<ResourceKey>("key").context("missing key")?.clone();
    Ok((kind, key))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a run report, optionally waiting for its deployment watches
async fn finish(report: MigrationReport, wait: bool, json: bool) -> Result<bool> {
    let success = report.success();
    if json {
        print_json(&serde_json::json!({
            "runId": report.run_id.to_string(),
            "plan": &report.plan,
            "result": &report.result,
        }))?;
    } else {
        print!("{}", render::report(&report));
    }

    if wait {
        let watches = report.reconciliations.into_iter().map(|handle| async move {
            let deployment_id = handle.deployment_id().to_string();
            (deployment_id, handle.join().await)
        });
        for (deployment_id, outcome) in join_all(watches).await {
            println!("{}", render::reconciliation(&deployment_id, &outcome));
        }
    } else if !report.reconciliations.is_empty() {
        tracing::warn!(
            "Exiting without waiting for {} deployment watches; pass --wait to clean up old versions",
            report.reconciliations.len()
        );
    }
    Ok(success)
}

async fn run(matches: ArgMatches) -> Result<bool> {
    let config = load_config(matches.get_one::<PathBuf>("config"))?;
    let engine = build_engine(config)?;

    match matches.subcommand() {
        Some(("plan", args)) => {
            let (kind, key) = resource(args)?;
            let plan = engine.plan(kind, &key, args.get_one::<LineageDirection>("direction").copied()).await;
            if args.get_flag("json") {
                print_json(&plan)?;
            } else {
                print!("{}", render::plan(&plan));
            }
            Ok(true)
        }
        Some(("review", args)) => {
            let (kind, key) = resource(args)?;
            let review = engine.review(kind, &key).await?;
            if args.get_flag("json") {
                print_json(&review)?;
            } else {
                print!("{}", render::review(&review));
            }
            Ok(true)
        }
        Some(("migrate", args)) => {
            let (kind, key) = resource(args)?;
            let mut request = MigrationRequest::new(kind, key);
            if let Some(direction) = args.get_one::<LineageDirection>("direction") {
                request = request.with_direction(*direction);
            }
            if args.get_flag("no-deps") {
                request = request.without_dependencies();
            }
            if let Some(path) = args.get_one::<PathBuf>("overrides") {
                request.overrides = load_overrides(path)?;
            }

            let report = engine.migrate(&request).await;
            finish(report, args.get_flag("wait"), args.get_flag("json")).await
        }
        Some(("stage", args)) => {
            let (kind, key) = resource(args)?;
            let report = engine
                .stage(kind, &key, args.get_one::<LineageDirection>("direction").copied())
                .await?;
            print!("{}", render::stage(&report));
            Ok(report.skipped.is_empty())
        }
        Some(("import-staged", args)) => {
            let file = args.get_one::<PathBuf>("file").context("missing file")?;
            let report = engine.import_staged(file).await?;
            finish(report, args.get_flag("wait"), args.get_flag("json")).await
        }
        _ => anyhow::bail!("unknown command"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("json-logs"));

    match run(matches).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("migctl: {err:#}");
            ExitCode::FAILURE
        }
    }
}
