//! Interactive ticker watch. Each symbol entered on stdin schedules a
//! debounced headline fetch; entering a new symbol aborts the pending fetch
//! and supersedes any still in flight, so a late result for an old symbol
//! never overwrites a newer one.

use crate::render;
use pulse_core::domain::news::NewsItem;
use pulse_core::llm::gateway::Gateway;
use pulse_core::session::{Slot, Ticket};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Courtesy rate limit: the fetch fires only after the symbol has been
/// stable for this long.
const NEWS_DEBOUNCE: Duration = Duration::from_millis(1500);

pub async fn run(gateway: &Gateway) -> anyhow::Result<()> {
    println!("Enter a ticker to follow (empty line to exit).");

    let (tx, mut rx) = mpsc::channel::<(Ticket, String, Vec<NewsItem>)>(8);
    let mut slot: Slot<Vec<NewsItem>> = Slot::new();
    let mut pending: Option<JoinHandle<()>> = None;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let ticker = line.trim().to_uppercase();
                if ticker.is_empty() {
                    break;
                }

                if let Some(handle) = pending.take() {
                    handle.abort();
                }

                let ticket = slot.dispatch();
                let gateway = gateway.clone();
                let tx = tx.clone();
                println!("watching {ticker}...");
                pending = Some(tokio::spawn(async move {
                    tokio::time::sleep(NEWS_DEBOUNCE).await;
                    let items = gateway.fetch_market_news(&ticker).await;
                    let _ = tx.send((ticket, ticker, items)).await;
                }));
            }
            Some((ticket, ticker, items)) = rx.recv() => {
                if !slot.accept(ticket, items) {
                    tracing::debug!(%ticker, "discarding stale headline batch");
                    continue;
                }
                match slot.get() {
                    Some(items) if !items.is_empty() => render::print_news(items),
                    _ => println!("No recent news found for {ticker}."),
                }
            }
        }
    }

    if let Some(handle) = pending.take() {
        handle.abort();
    }
    Ok(())
}
