//! `probe` binary entry point

use probe_cli::cli::{command, Invocation};
use probe_cli::{commands, logging, shutdown, API_KEY_VAR};
use probe_runner::CancellationToken;
use tracing::{error, info};

async fn dispatch(invocation: Invocation) -> anyhow::Result<()> {
    match invocation {
        Invocation::CreateScenarios { api, output_file } => {
            let count = commands::create_scenarios(api, &output_file)?;
            info!(count, path = %output_file.display(), "scenarios written");
        }
        Invocation::RunScenarios(args) => {
            let api_key = std::env::var(API_KEY_VAR)
                .map_err(|_| anyhow::anyhow!("{API_KEY_VAR} must be set to run scenarios"))?;
            let token = CancellationToken::new();
            shutdown::spawn_listener(token.clone());
            commands::run_scenarios(&args, &api_key, &token).await?;
        }
        Invocation::Report { results_file } => {
            print!("{}", commands::report(&results_file)?);
        }
        Invocation::Compare(args) => {
            print!("{}", commands::compare(&args)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = command().get_matches();

    if let Err(e) = logging::init(matches.get_flag("log-json")) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }

    let result = match Invocation::from_matches(&matches) {
        Ok(invocation) => dispatch(invocation).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}
