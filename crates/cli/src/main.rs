use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_core::config::Settings;
use pulse_core::domain::chat::ChatMessage;
use pulse_core::llm::anthropic::AnthropicClient;
use pulse_core::llm::gateway::Gateway;
use pulse_core::storage::HistoryStore;

mod render;
mod watch;

const CHAT_GREETING: &str = "Hello! I am your financial assistant. Ask me anything about \
     trading strategies, terminology, or specific assets.";

#[derive(Debug, Parser)]
#[command(
    name = "pulse",
    about = "AI trade advisor: search-grounded analysis, market news and chat from the terminal"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a full trade analysis for a ticker and save it to history.
    Analyze {
        ticker: String,

        /// Extra context appended to the analysis prompt.
        #[arg(long, default_value = "")]
        context: String,

        /// Skip the supplementary headline fetch.
        #[arg(long)]
        no_news: bool,
    },

    /// Search-grounded market headlines for a ticker or topic.
    News { query: String },

    /// One-sentence definition of a financial term.
    Define { term: String },

    /// Explain why a risk factor matters for a ticker right now.
    Risk { ticker: String, risk: String },

    /// Interactive chat with the financial assistant.
    Chat,

    /// Follow tickers interactively; headlines refresh as you enter new symbols.
    Watch,

    /// Saved analyses.
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    /// List saved analyses, newest first.
    List,

    /// Print one saved analysis in full.
    Show { id: String },

    /// Delete one saved analysis.
    Remove { id: String },

    /// Delete all saved analyses.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::History { command } => run_history(&settings, command)?,
        command => {
            let client = AnthropicClient::from_settings(&settings)?;
            let gateway = Gateway::new(Arc::new(client));

            match command {
                Command::Analyze {
                    ticker,
                    context,
                    no_news,
                } => run_analyze(&settings, &gateway, &ticker, &context, no_news).await?,
                Command::News { query } => run_news(&gateway, &query).await,
                Command::Define { term } => println!("{}", gateway.quick_lookup(&term).await),
                Command::Risk { ticker, risk } => {
                    println!("{}", gateway.explain_risk_factor(&ticker, &risk).await);
                }
                Command::Chat => run_chat(&gateway).await?,
                Command::Watch => watch::run(&gateway).await?,
                Command::History { .. } => unreachable!("handled above"),
            }
        }
    }

    Ok(())
}

async fn run_analyze(
    settings: &Settings,
    gateway: &Gateway,
    ticker: &str,
    context: &str,
    no_news: bool,
) -> anyhow::Result<()> {
    let ticker = ticker.trim().to_uppercase();
    anyhow::ensure!(!ticker.is_empty(), "ticker must be non-empty");

    // Headlines are supplementary and fetched alongside the analysis; they
    // degrade to nothing, the analysis does not.
    let (analysis, news) = if no_news {
        (gateway.analyze_trade(&ticker, context).await, Vec::new())
    } else {
        tokio::join!(
            gateway.analyze_trade(&ticker, context),
            gateway.fetch_market_news(&ticker)
        )
    };

    let analysis = match analysis {
        Ok(analysis) => analysis,
        Err(err) => {
            let err = anyhow::Error::new(err).context(format!("analysis failed for {ticker}"));
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    };

    render::print_analysis(&ticker, &analysis);
    if !news.is_empty() {
        render::print_news(&news);
    }

    let mut history = HistoryStore::open(settings.history_path());
    let entry = history
        .record(analysis, &ticker)
        .context("failed to save the analysis to history")?;
    tracing::info!(id = %entry.id, %ticker, "analysis saved to history");

    Ok(())
}

async fn run_news(gateway: &Gateway, query: &str) {
    let items = gateway.fetch_market_news(query).await;
    if items.is_empty() {
        println!("No recent news found for {query}.");
    } else {
        render::print_news(&items);
    }
}

async fn run_chat(gateway: &Gateway) -> anyhow::Result<()> {
    let mut log = vec![ChatMessage::model(CHAT_GREETING)];
    println!("assistant> {CHAT_GREETING}");
    println!("(empty line to exit)");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim().to_string();
        if input.is_empty() {
            break;
        }

        let reply = match gateway.send_chat_message(&log, &input).await {
            Ok(text) if text.trim().is_empty() => "I couldn't generate a response.".to_string(),
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "chat turn failed");
                "Sorry, I encountered an error connecting to the server.".to_string()
            }
        };
        println!("assistant> {reply}");

        // The adapter is stateless across calls; the session log lives here.
        log.push(ChatMessage::user(input));
        log.push(ChatMessage::model(reply));
    }

    Ok(())
}

fn run_history(settings: &Settings, command: HistoryCommand) -> anyhow::Result<()> {
    let mut history = HistoryStore::open(settings.history_path());

    match command {
        HistoryCommand::List => {
            if history.entries().is_empty() {
                println!("No saved analyses.");
            }
            for entry in history.entries() {
                render::print_history_line(entry);
            }
        }
        HistoryCommand::Show { id } => match history.find(&id) {
            Some(entry) => {
                println!("{} ({})", entry.timestamp.format("%Y-%m-%d %H:%M"), entry.id);
                render::print_analysis(&entry.ticker, &entry.analysis);
            }
            None => println!("No saved analysis with id {id}."),
        },
        HistoryCommand::Remove { id } => {
            if history.remove(&id)? {
                println!("Removed {id}.");
            } else {
                println!("No saved analysis with id {id}.");
            }
        }
        HistoryCommand::Clear => {
            history.clear()?;
            println!("History cleared.");
        }
    }

    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
