//! ensemble-bench entry point

use clap::Parser;
use ensemble_bench::cli::{print_summary, Cli};
use ensemble_bench::experiment::ExperimentRunner;

fn main() -> anyhow::Result<()> {
    // stdout carries the progress lines
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ensemble_bench=info".into()),
        )
        .init();

    let config = Cli::parse().into_config();
    let runner = ExperimentRunner::new(config);
    let report = runner.run()?;
    print_summary(runner.config(), &report);

    Ok(())
}
