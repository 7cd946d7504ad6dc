#![allow(clippy::expect_used, clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: Drain a POP3 mailbox
//!
//! Connects over implicit TLS, logs in, prints the mailbox summary, then
//! retrieves and deletes up to `POP3_LIMIT` messages (default 10).
//!
//! ## Running
//!
//! ```bash
//! POP3_HOST=pop.example.com POP3_USER=me POP3_PASSWORD=secret \
//!     RUST_LOG=mailledger_pop3=debug \
//!     cargo run --package mailledger-pop3 --example drain
//! ```

use std::env;

use mailledger_pop3::{Config, Session};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = env::var("POP3_HOST").expect("POP3_HOST is required");
    let user = env::var("POP3_USER").expect("POP3_USER is required");
    let password = env::var("POP3_PASSWORD").expect("POP3_PASSWORD is required");
    let limit: usize = env::var("POP3_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    let config = Config::new(host);
    println!("Connecting to {}:{}...", config.host, config.port);
    let mut session = Session::connect(&config).await?;

    session.login(&user, &password).await?;
    println!("✓ Authenticated as {}", user);

    let stat = session.stat().await?;
    println!("{} messages, {} octets\n", stat.count, stat.octets);

    let mut drained = 0;
    let mut drain = session.drain();
    while drained < limit {
        let Some(message) = drain.next().await else {
            break;
        };
        let message = message?;
        let subject = message
            .lines()
            .find_map(|line| line.strip_prefix("Subject: "))
            .unwrap_or("(no subject)");
        println!("  - {} ({} bytes)", subject, message.len());
        drained += 1;
    }

    drop(drain);

    session.quit().await?;
    println!("\n✓ Drained {} messages", drained);

    Ok(())
}
