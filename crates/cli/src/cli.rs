//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    name = "stockflow",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inventory of products assembled from stocked articles."
)]
pub struct Cli {
    /// Directory holding inventory.json and products.json (development only).
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List every article with its stock.
    Articles,
    /// List every product.
    Products,
    /// List products that can be sold right now.
    Available,
    /// Sell units of a product, then print the outcome.
    Sell {
        /// Product id, or exact product name.
        product: String,
        amount: u32,
    },
}
