use std::io::Write;

use clap::{CommandFactory, Parser, error::ErrorKind};
use kubectl_ps::{Cli, Config, KubernetesLoader, Result, init_logger, run};
use log::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger();

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => Cli::command().error(ErrorKind::InvalidValue, e).exit(),
    };
    debug!("Scope: {}", config.scope);
    debug!("Columns: {:?}", config.columns);

    let loader = KubernetesLoader::new().await?;
    let table = run(
        &loader,
        &config,
        loader.default_namespace(),
        chrono::Utc::now(),
    )
    .await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(table.as_bytes())?;
    stdout.flush()?;

    Ok(())
}
