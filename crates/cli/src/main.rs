use clap::Parser;
use serde::Serialize;

use stockflow_cli::cli::{Cli, Command};
use stockflow_cli::{SaleOutcome, bootstrap};
use stockflow_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    stockflow_observability::init(&config.log);
    tracing::debug!(?config, "configuration loaded");

    let app = bootstrap(&config).await?;

    match cli.command {
        Command::Articles => print_json(&app.articles().await?),
        Command::Products => print_json(&app.products().await?),
        Command::Available => print_json(&app.available().await?),
        Command::Sell { product, amount } => {
            let product_id = app.resolve(&product).await?;
            let outcome = app.sell(product_id, amount).await?;
            print_json(&outcome)?;
            if let SaleOutcome::Rejected { failure } = outcome {
                anyhow::bail!("sale rejected: {}", failure.reason);
            }
            Ok(())
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
