mod logging;

use clap::{CommandFactory, Parser};
use polyask::config::Overrides;
use polyask::{
    AppConfig, ConfigManager, EnvSnapshot, LineupEntry, Orchestrator, ReqwestTransport,
    builtin_providers, render,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "polyask",
    version,
    about = "Ask several AI providers the same question at once"
)]
struct Cli {
    /// Question to ask; words are joined with spaces
    #[arg(value_name = "QUESTION", trailing_var_arg = true)]
    question: Vec<String>,

    /// Comma-separated providers to ask, in report order
    #[arg(long, value_delimiter = ',')]
    providers: Option<Vec<String>>,

    /// Attempts per provider before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Base retry backoff in seconds (doubles per attempt)
    #[arg(long)]
    backoff_secs: Option<f64>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Delay between provider launches in seconds
    #[arg(long)]
    stagger_secs: Option<f64>,

    /// Config file (default: ~/.polyask/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (default: ~/.polyask/polyask.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Mirror log lines to stderr
    #[arg(short, long)]
    verbose: bool,

    /// List built-in providers and whether a credential is available
    #[arg(long)]
    list_providers: bool,
}

impl Cli {
    fn question(&self) -> Option<String> {
        let question = self.question.join(" ");
        let question = question.trim();
        (!question.is_empty()).then(|| question.to_string())
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            providers: self.providers.clone(),
            max_attempts: self.max_attempts,
            backoff_secs: self.backoff_secs,
            timeout_secs: self.timeout_secs,
            stagger_secs: self.stagger_secs,
            log_file: self.log_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env = EnvSnapshot::capture();
    let overrides = cli.overrides();

    let manager = ConfigManager::locate(cli.config.as_deref(), &env);
    let config = match manager.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("polyask: {e:#}");
            return ExitCode::from(2);
        }
    };

    if cli.list_providers {
        return list_providers(&config, &env);
    }

    let Some(question) = cli.question() else {
        eprintln!("{}", Cli::command().render_usage());
        return ExitCode::from(1);
    };

    let log_path = config.log_file(&env, &overrides);
    if let Err(e) = logging::init(&log_path, cli.verbose) {
        eprintln!("polyask: {e:#}");
        return ExitCode::from(2);
    }

    let settings = config.run_settings(&env, &overrides);
    let transport = match ReqwestTransport::new(settings.timeout) {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            eprintln!("polyask: failed to build HTTP client: {e}");
            return ExitCode::from(2);
        }
    };

    let lineup = match config.lineup(&env, &overrides) {
        Ok(lineup) => lineup,
        Err(e) => {
            tracing::error!(error = %e, "invalid provider configuration");
            eprintln!("polyask: {e}");
            return ExitCode::from(2);
        }
    };

    tracing::info!(
        config = %manager.path().display(),
        providers = lineup.len(),
        max_attempts = settings.max_attempts,
        timeout_secs = settings.timeout.as_secs_f64(),
        "starting run"
    );

    let orchestrator = Orchestrator::new(Arc::new(transport), settings);
    let results = orchestrator.run(&question, &lineup).await;
    print!("{}", render(&results));
    ExitCode::SUCCESS
}

fn list_providers(config: &AppConfig, env: &EnvSnapshot) -> ExitCode {
    let overrides = Overrides {
        providers: Some(builtin_providers().iter().map(|p| p.name.to_string()).collect()),
        ..Overrides::default()
    };
    let lineup = match config.lineup(env, &overrides) {
        Ok(lineup) => lineup,
        Err(e) => {
            eprintln!("polyask: {e}");
            return ExitCode::from(2);
        }
    };

    for (entry, builtin) in lineup.iter().zip(builtin_providers()) {
        if let LineupEntry::Provider(spec) = entry {
            let key = if spec.credential().is_some() { "set" } else { "missing" };
            println!(
                "{:<12} {:<28} key {:<8} ({})",
                spec.name, spec.model, key, builtin.key_env
            );
        }
    }
    ExitCode::SUCCESS
}
