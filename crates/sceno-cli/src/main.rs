//! Sceno CLI: run declarative end-to-end browser scenarios
//!
//! ## Usage
//!
//! ```bash
//! sceno validate --suite demos/saucedemo.yaml
//! sceno list --suite demos/saucedemo.yaml
//! sceno run --suite demos/saucedemo.yaml -j 4 --reporter junit --output report.xml
//! SCENO_LOG=sceno=debug sceno run --suite demos/saucedemo.yaml --log-format json
//! ```

use clap::Parser;
use sceno_cli::{logging, runner, Cli, CliConfig, CliResult, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);

    if let Err(e) = logging::init(&config) {
        eprintln!("Error: {e}");
        return ExitCode::from(e.exit_code());
    }

    match run(&cli, &config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}

fn run(cli: &Cli, config: &CliConfig) -> CliResult<u8> {
    match cli.command {
        Commands::Validate(ref args) => runner::validate(config, &args.suite).map(|()| 0),
        Commands::List(ref args) => runner::list(&args.suite).map(|()| 0),
        Commands::Run(ref args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(runner::run(config, args))
        }
    }
}
