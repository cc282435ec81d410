//! `concierge transcript` — Show the displayable conversation transcript.
//!
//! Only USER_FACING rows are shown; tool-call bookkeeping stays hidden.

use crate::runtime::Runtime;
use concierge_core::history::HistoryStore;

pub async fn run(user: i64, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build().await?;
    let records = runtime.history.transcript(user, limit).await?;

    if records.is_empty() {
        println!("No conversation history for user {user}.");
        return Ok(());
    }

    for record in records {
        let when = record.created_at.format("%Y-%m-%d %H:%M");
        println!("[{when}] {:<9} {}", record.role.as_str(), record.content);
    }

    Ok(())
}
