mod config;

use anyhow::{Context, Result};
use config::{Args, Command};
use launchpad_core::{
    chain::{address_rejection_reason, lamports_to_sol, sol_to_lamports, SimulatedChain},
    config::PlatformConfig,
    csv_import::import_recipients_from_csv,
    ledger::Ledger,
    services::{AirdropService, MemoryAirdropService, MemoryPortfolioService, ServiceContext},
    tx_log::MemoryTransactionLog,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output can be piped.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = config::load_config();
    let platform = PlatformConfig::from_env()?;

    let output = execute(&args, &platform).await?;
    println!("{}", output);
    Ok(())
}

/// Offline airdrop service: simulated chain, throwaway ledger and history.
fn airdrop_service(args: &Args, platform: &PlatformConfig) -> MemoryAirdropService {
    let ledger = Arc::new(Ledger::new());
    let tracker = Arc::new(MemoryPortfolioService::new(
        ledger.clone(),
        Arc::new(MemoryTransactionLog::new()),
    ));
    let chain = Arc::new(SimulatedChain::with_fee(args.lamports_per_signature));
    MemoryAirdropService::new(ServiceContext::new(chain, ledger, tracker, platform))
}

async fn execute(args: &Args, platform: &PlatformConfig) -> Result<String> {
    match &args.command {
        Command::ValidateCsv { path } => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let import = import_recipients_from_csv(&content);
            let total: f64 = import.recipients.iter().map(|r| r.amount).sum();
            info!(
                "Parsed {}: {} recipients, {} rejected rows",
                path.display(),
                import.recipients.len(),
                import.errors.len()
            );

            if args.json {
                return Ok(serde_json::to_string_pretty(&json!({
                    "recipients": import.recipients,
                    "errors": import.errors,
                    "totalAmount": total,
                }))?);
            }

            let mut lines = vec![format!(
                "{} recipients, {} tokens in total, {} rejected rows",
                import.recipients.len(),
                total,
                import.errors.len()
            )];
            if import.recipients.len() > platform.limits.max_airdrop_recipients {
                lines.push(format!(
                    "warning: more than {} recipients, split the list into several airdrops",
                    platform.limits.max_airdrop_recipients
                ));
            }
            for err in &import.errors {
                lines.push(format!("line {}: {}", err.row, err.reason));
            }
            Ok(lines.join("\n"))
        }
        Command::EstimateAirdrop { recipients } => {
            let service = airdrop_service(args, platform);
            let cost = service.estimate_airdrop_cost(*recipients).await?;
            let batch = platform.limits.max_airdrop_batch_size.max(1);
            let batches = recipients.div_ceil(batch);
            debug!("Estimated {} recipients in {} batches", recipients, batches);

            if args.json {
                return Ok(serde_json::to_string_pretty(&json!({
                    "recipients": recipients,
                    "batches": batches,
                    "estimatedCostSol": cost,
                    "platformFeeSol": platform.fees.airdrop_execution,
                }))?);
            }
            Ok(format!(
                "{} recipients in {} batches: about {:.9} SOL (includes {} SOL platform fee)",
                recipients, batches, cost, platform.fees.airdrop_execution
            ))
        }
        Command::ValidateAddress { address } => {
            let reason = address_rejection_reason(address);
            if args.json {
                return Ok(json!({ "address": address, "valid": reason.is_none(), "reason": reason })
                    .to_string());
            }
            Ok(match reason {
                None => format!("{} is a valid address", address),
                Some(reason) => format!("{} is invalid: {}", address, reason),
            })
        }
        Command::Convert { sol, lamports } => {
            let (sol, lamports) = match (sol, lamports) {
                (Some(sol), _) => {
                    anyhow::ensure!(sol.is_finite() && *sol >= 0.0, "SOL amount must be non-negative");
                    (*sol, sol_to_lamports(*sol))
                }
                (None, Some(lamports)) => (lamports_to_sol(*lamports), *lamports),
                (None, None) => anyhow::bail!("pass --sol or --lamports"),
            };
            if args.json {
                return Ok(json!({ "sol": sol, "lamports": lamports }).to_string());
            }
            Ok(format!("{} SOL = {} lamports", sol, lamports))
        }
    }
}
