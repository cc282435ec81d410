//! `concierge compact` — Collapse a user's history into a summary row.

use crate::runtime::Runtime;
use concierge_history::compact_history;

pub async fn run(user: i64) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build().await?;
    let status =
        compact_history(runtime.history.as_ref(), runtime.gateway.as_ref(), user).await?;
    println!("{status}");
    Ok(())
}
