use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use dbt_oracle::connection::OracleConnectionManager;
use dbt_oracle::driver::ConnectionFactory;
use dbt_oracle::profile;
use dbt_oracle::python_submissions::{PythonJob, PythonModelConfig, DEFAULT_TIMEOUT_IN_SECONDS};
use dbt_oracle::quoting;
use dbt_oracle::relation::{OracleRelation, RelationType};
use dbt_oracle::relation_configs::{plan, reconcile, MaterializedViewConfig};
use dbt_oracle::OracleAdapter;

/// Oracle adapter smoke CLI
#[derive(Parser)]
#[command(name = "oracle_smoke", version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(clap::Args)]
struct ProfileArgs {
  /// Path to a profiles.yml file
  #[arg(long)]
  profile: PathBuf,
  /// Profile name, needed when the file holds more than one
  #[arg(long)]
  profile_name: Option<String>,
  /// Target inside the profile, defaults to the profile's `target`
  #[arg(long)]
  target: Option<String>,
}

#[derive(Subcommand)]
enum Command {
  /// Open a connection and run the debug query
  Debug {
    #[command(flatten)]
    profile: ProfileArgs,
  },
  /// Show how identifiers would be rendered in generated SQL
  Quote {
    #[arg(required = true)]
    identifiers: Vec<String>,
  },
  /// Compare two materialized view configs (JSON files) and print the plan
  MviewDiff {
    desired: PathBuf,
    existing: PathBuf,
    #[arg(long, default_value = "dbt")]
    schema: String,
  },
  /// Run a Python model script through OML4Py
  PyRun {
    #[command(flatten)]
    profile: ProfileArgs,
    #[arg(long)]
    alias: String,
    #[arg(long = "async")]
    async_flag: bool,
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_IN_SECONDS)]
    timeout: u64,
    #[arg(long, default_value = "HIGH")]
    service: String,
    #[arg(long)]
    conda_env: Option<String>,
  },
}

fn print_json<T: serde::Serialize>(value: &T) {
  match serde_json::to_string_pretty(value) {
    Ok(s) => println!("{}", s),
    Err(e) => eprintln!("failed to serialize: {}", e),
  }
}

fn load_target(args: &ProfileArgs) -> Result<profile::Target, u8> {
  profile::load_target(&args.profile, args.profile_name.as_deref(), args.target.as_deref()).map_err(|e| {
    eprintln!("{}", e);
    2
  })
}

fn cmd_debug(args: &ProfileArgs) -> u8 {
  let target = match load_target(args) {
    Ok(t) => t,
    Err(code) => return code,
  };
  let factory = match ConnectionFactory::from_env() {
    Ok(f) => f,
    Err(e) => {
      eprintln!("{}", e);
      return 3;
    }
  };
  for (key, value) in target.credentials.connection_info() {
    println!("  {}: {}", key, value);
  }
  let manager = OracleConnectionManager::new(factory, target.credentials, "debug");
  let mut adapter = OracleAdapter::new(manager);
  match adapter.debug_query() {
    Ok(response) => {
      println!("Connection test: [{}]", response);
      0
    }
    Err(e) => {
      eprintln!("Connection test: [ERROR]\n{}", e);
      4
    }
  }
}

fn cmd_quote(identifiers: &[String]) -> u8 {
  let rendered: Vec<_> = identifiers
    .iter()
    .map(|id| json!({ "identifier": id, "rendered": quoting::check_and_quote_identifier(id, None) }))
    .collect();
  print_json(&rendered);
  0
}

fn read_config(path: &PathBuf) -> Result<MaterializedViewConfig, u8> {
  let text = std::fs::read_to_string(path).map_err(|e| {
    eprintln!("Cannot read {}: {}", path.display(), e);
    2
  })?;
  serde_json::from_str(&text).map_err(|e| {
    eprintln!("Invalid materialized view config in {}: {}", path.display(), e);
    2
  })
}

fn cmd_mview_diff(desired: &PathBuf, existing: &PathBuf, schema: &str) -> u8 {
  let (desired, existing) = match (read_config(desired), read_config(existing)) {
    (Ok(d), Ok(e)) => (d, e),
    (Err(code), _) | (_, Err(code)) => return code,
  };
  let relation = OracleRelation::create(None, Some(schema), Some(desired.name.as_str())).with_type(RelationType::MaterializedView);
  let changes = reconcile(&desired, &existing);
  print_json(&json!({
    "requires_full_refresh": changes.as_ref().map(|c| c.requires_full_refresh()).unwrap_or(false),
    "changes": changes,
    "plan": plan(&relation, &desired, Some(&existing)),
  }));
  0
}

async fn cmd_py_run(args: &ProfileArgs, alias: &str, config: PythonModelConfig) -> u8 {
  let target = match load_target(args) {
    Ok(t) => t,
    Err(code) => return code,
  };
  let mut job = match PythonJob::from_model(alias, config, &target.credentials) {
    Ok(job) => job,
    Err(e) => {
      eprintln!("{}", e);
      return 2;
    }
  };
  match job.run().await {
    Ok(()) => {
      println!("Python model {} completed", alias);
      0
    }
    Err(e) => {
      eprintln!("{}", e);
      5
    }
  }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
  dbt_oracle::init_logging();
  let cli = Cli::parse();
  let code = match &cli.command {
    Command::Debug { profile } => cmd_debug(profile),
    Command::Quote { identifiers } => cmd_quote(identifiers),
    Command::MviewDiff { desired, existing, schema } => cmd_mview_diff(desired, existing, schema),
    Command::PyRun { profile, alias, async_flag, timeout, service, conda_env } => {
      let config = PythonModelConfig {
        conda_env_name: conda_env.clone(),
        timeout: *timeout,
        async_flag: *async_flag,
        service: service.clone(),
      };
      cmd_py_run(profile, alias, config).await
    }
  };
  ExitCode::from(code)
}
