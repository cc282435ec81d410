//! `concierge remind` — Run the reminder sweep once, or keep it running.

use crate::runtime::Runtime;

pub async fn run(watch: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build().await?;
    let job = runtime.reminder_job();

    if watch {
        println!(
            "Reminder job running every {}s. Ctrl-C to stop.",
            runtime.config.reminder.interval_secs
        );
        job.run().await;
        return Ok(());
    }

    let delivered = job.run_once().await?;
    println!("Reminder sweep complete: {delivered} delivered.");
    Ok(())
}
