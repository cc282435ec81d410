//! `concierge chat` — Interactive or single-message chat mode.

use crate::runtime::Runtime;
use std::io::{BufRead, Write};

pub async fn run(message: Option<String>, user: i64) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build().await?;

    let (base_url_missing, api_key_missing) =
        missing_credentials(&runtime.config.llm.base_url, runtime.config.api_key.is_some());
    if base_url_missing || api_key_missing {
        eprintln!();
        eprintln!("  WARNING: The assistant will reply with a fixed fallback until:");
        if base_url_missing {
            eprintln!("    - the LLM endpoint is set:  export CONCIERGE_BASE_URL='https://api.openai.com'");
        }
        if api_key_missing {
            eprintln!("    - an API key is set:        export OPENAI_API_KEY='sk-...'  (or CONCIERGE_API_KEY)");
        }
        eprintln!(
            "  Or add them to {}",
            concierge_config::AppConfig::config_dir().join("config.toml").display()
        );
        eprintln!();
    }

    let orchestrator = runtime.orchestrator();

    if let Some(text) = message {
        let reply = orchestrator.handle_message(user, &text).await?;
        println!("{reply}");
        return Ok(());
    }

    println!("Concierge — interactive chat (user {user}). Type 'exit' to quit.\n");
    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = orchestrator.handle_message(user, text).await?;
        println!("assistant> {reply}\n");
    }

    Ok(())
}

/// The gateway degrades to its fallback reply when the base URL is blank,
/// and the API itself rejects requests without a key. Warn on both.
fn missing_credentials(base_url: &str, has_api_key: bool) -> (bool, bool) {
    (base_url.trim().is_empty(), !has_api_key)
}

#[cfg(test)]
mod tests {
    use super::missing_credentials;

    #[test]
    fn blank_base_url_triggers_the_warning_even_with_a_key() {
        assert_eq!(missing_credentials("   ", true), (true, false));
        assert_eq!(missing_credentials("", true), (true, false));
    }

    #[test]
    fn configured_endpoint_and_key_warn_about_nothing() {
        assert_eq!(missing_credentials("https://api.openai.com", true), (false, false));
    }

    #[test]
    fn missing_key_is_flagged_independently() {
        assert_eq!(missing_credentials("https://api.openai.com", false), (false, true));
    }
}
