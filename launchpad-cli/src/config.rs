use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Lamports charged per transaction signature
    #[arg(long, env = "LAMPORTS_PER_SIGNATURE", default_value_t = 5_000)]
    pub lamports_per_signature: u64,

    /// Print machine readable JSON instead of text
    #[arg(long, env = "LAUNCHPAD_JSON", default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check an `address,amount` recipient file before creating an airdrop
    ValidateCsv {
        /// Path to the CSV file
        path: PathBuf,
    },
    /// Estimate the SOL needed to execute an airdrop
    EstimateAirdrop {
        /// Number of recipients
        #[arg(short, long)]
        recipients: usize,
    },
    /// Check that an address is a valid public key
    ValidateAddress {
        address: String,
    },
    /// Convert between SOL and lamports
    Convert {
        /// Amount in SOL
        #[arg(long, conflicts_with = "lamports", required_unless_present = "lamports")]
        sol: Option<f64>,
        /// Amount in lamports
        #[arg(long)]
        lamports: Option<u64>,
    },
}

pub fn load_config() -> Args {
    dotenv().ok();
    Args::parse()
}
