//! Argument definitions and parsing

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use probe_apis::{Api, ApiError};
use probe_runner::{ConfigError, RunnerConfig};
use std::path::PathBuf;

const API_HELP: &str = "API to target: chatcompletions or embeddings";

fn parse_api(value: &str) -> Result<Api, ApiError> {
    value.parse()
}

fn api_arg() -> Arg {
    Arg::new("api")
        .long("api")
        .required(true)
        .value_parser(parse_api)
        .help(API_HELP)
}

fn path_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

/// Full command tree of the `probe` binary
#[must_use]
pub fn command() -> Command {
    Command::new("probe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Combinatorial API probing: generate scenarios, run them, report and compare results")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("create-scenarios")
                .about("Create scenarios for the given API")
                .arg(api_arg())
                .arg(path_arg("output-file", "Path to the scenarios file to write")),
        )
        .subcommand(
            Command::new("run-scenarios")
                .about("Run pending scenarios and record their results")
                .long_about(
                    "Run pending scenarios and record their results.\n\n\
                     Stops when every scenario is settled, when the upstream quota is exhausted, \
                     or when the remaining scenarios have used up their trials. \
                     The API key is read from OPENAI_API_KEY.",
                )
                .arg(api_arg())
                .arg(path_arg(
                    "scenarios-file",
                    "Scenarios file; scenarios missing from the results file are added to it",
                ))
                .arg(path_arg(
                    "results-file",
                    "Gzip results file; created when absent, resumed when present",
                ))
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML runner configuration; flags override its values"),
                )
                .arg(
                    Arg::new("base-url")
                        .long("base-url")
                        .help("API root, e.g. https://api.openai.com/v1"),
                )
                .arg(
                    Arg::new("rate-limit")
                        .long("rate-limit")
                        .value_parser(value_parser!(f64))
                        .help("Requests per second; 0 disables pacing"),
                )
                .arg(
                    Arg::new("max-trials")
                        .long("max-trials")
                        .value_parser(value_parser!(usize))
                        .help("Attempts per scenario on network errors and 5xx replies"),
                )
                .arg(
                    Arg::new("passes")
                        .long("passes")
                        .value_parser(value_parser!(usize))
                        .help("Times the pending scenarios are re-run; should exceed max-trials"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Print the results as CSV")
                .arg(path_arg("results-file", "Gzip results file")),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare two results files scenario by scenario")
                .arg(path_arg("left", "Baseline results file"))
                .arg(path_arg("right", "Results file compared against the baseline"))
                .arg(api_arg())
                .arg(
                    Arg::new("method")
                        .long("method")
                        .action(ArgAction::Append)
                        .help("Comparison method (base, structure); repeatable, defaults to both"),
                )
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Print per-scenario diffs"),
                ),
        )
}

/// Settings of the `run-scenarios` command
#[derive(Debug, Clone, PartialEq)]
pub struct RunArgs {
    pub api: Api,
    pub scenarios_file: PathBuf,
    pub results_file: PathBuf,
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub rate_limit: Option<f64>,
    pub max_trials: Option<usize>,
    pub passes: Option<usize>,
}

impl RunArgs {
    /// Defaults, then the config file, then flags
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the config file cannot be loaded or the
    /// merged values are out of range
    pub fn runner_config(&self) -> Result<RunnerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::from_file(path)?,
            None => RunnerConfig::default(),
        };
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(rate_limit) = self.rate_limit {
            config = config.with_rate_limit(rate_limit);
        }
        if let Some(max_trials) = self.max_trials {
            config = config.with_max_trials(max_trials);
        }
        if let Some(passes) = self.passes {
            config = config.with_passes(passes);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Settings of the `compare` command
#[derive(Debug, Clone, PartialEq)]
pub struct CompareArgs {
    pub left: PathBuf,
    pub right: PathBuf,
    pub api: Api,
    pub methods: Vec<String>,
    pub verbose: bool,
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    CreateScenarios { api: Api, output_file: PathBuf },
    RunScenarios(RunArgs),
    Report { results_file: PathBuf },
    Compare(CompareArgs),
}

fn required<T: Clone + Send + Sync + 'static>(args: &ArgMatches, id: &str) -> anyhow::Result<T> {
    args.get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing required argument --{id}"))
}

impl Invocation {
    /// Typed view of parsed matches
    ///
    /// # Errors
    /// Returns an error if no known subcommand was given
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        match matches.subcommand() {
            Some(("create-scenarios", args)) => Ok(Invocation::CreateScenarios {
                api: required(args, "api")?,
                output_file: required(args, "output-file")?,
            }),
            Some(("run-scenarios", args)) => Ok(Invocation::RunScenarios(RunArgs {
                api: required(args, "api")?,
                scenarios_file: required(args, "scenarios-file")?,
                results_file: required(args, "results-file")?,
                config: args.get_one::<PathBuf>("config").cloned(),
                base_url: args.get_one::<String>("base-url").cloned(),
                rate_limit: args.get_one::<f64>("rate-limit").copied(),
                max_trials: args.get_one::<usize>("max-trials").copied(),
                passes: args.get_one::<usize>("passes").copied(),
            })),
            Some(("report", args)) => Ok(Invocation::Report {
                results_file: required(args, "results-file")?,
            }),
            Some(("compare", args)) => {
                let methods: Vec<String> = args
                    .get_many::<String>("method")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_else(|| vec!["base".to_string(), "structure".to_string()]);
                Ok(Invocation::Compare(CompareArgs {
                    left: required(args, "left")?,
                    right: required(args, "right")?,
                    api: required(args, "api")?,
                    methods,
                    verbose: args.get_flag("verbose"),
                }))
            }
            Some((other, _)) => anyhow::bail!("unknown command: {other}"),
            None => anyhow::bail!("no command given"),
        }
    }
}
