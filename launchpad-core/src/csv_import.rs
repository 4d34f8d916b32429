//! Recipient list import for airdrops.
//!
//! Accepts two columns, `address,amount`, with an optional header row.
//! Blank lines are skipped and every malformed row is reported with its line
//! number instead of aborting the import.

use crate::chain::address_rejection_reason;
use crate::models::RecipientInput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvRowError {
    /// 1-based line number in the source text.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientImport {
    pub recipients: Vec<RecipientInput>,
    pub errors: Vec<CsvRowError>,
}

pub fn import_recipients_from_csv(content: &str) -> RecipientImport {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut import = RecipientImport::default();
    let mut seen_data = false;

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let row = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(idx + 1);
                import.errors.push(CsvRowError {
                    row,
                    reason: format!("unreadable row: {e}"),
                });
                continue;
            }
        };
        let row = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);

        let fields: Vec<&str> = record.iter().collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }

        let first_data_row = !seen_data;
        seen_data = true;
        if first_data_row && looks_like_header(&fields) {
            continue;
        }

        match parse_row(&fields) {
            Ok(recipient) => import.recipients.push(recipient),
            Err(reason) => import.errors.push(CsvRowError { row, reason }),
        }
    }

    import
}

fn looks_like_header(fields: &[&str]) -> bool {
    fields.len() == 2
        && address_rejection_reason(fields[0]).is_some()
        && fields[1].parse::<f64>().is_err()
}

fn parse_row(fields: &[&str]) -> Result<RecipientInput, String> {
    if fields.len() != 2 {
        return Err(format!("expected 2 columns (address,amount), found {}", fields.len()));
    }
    let (address, amount) = (fields[0], fields[1]);

    if let Some(reason) = address_rejection_reason(address) {
        return Err(reason);
    }
    let amount: f64 = amount
        .parse()
        .map_err(|_| format!("amount {amount:?} is not a number"))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(format!("amount must be positive, got {amount}"));
    }

    Ok(RecipientInput {
        address: address.to_string(),
        amount,
    })
}
