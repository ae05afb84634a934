use pulse_core::domain::analysis::{HistoryEntry, TradeAnalysis, Trend};
use pulse_core::domain::news::{NewsItem, Sentiment};

pub fn print_analysis(ticker: &str, analysis: &TradeAnalysis) {
    println!();
    println!(
        "== {ticker}: {} ({:.0}% confidence) ==",
        analysis.recommendation.as_str(),
        analysis.confidence_clamped()
    );
    println!("{}", analysis.summary);

    if !analysis.key_metrics.is_empty() {
        println!();
        println!("Key metrics:");
        for metric in &analysis.key_metrics {
            println!("  {} {}: {}", trend_arrow(metric.trend), metric.label, metric.value);
        }
    }

    println!();
    println!("Reasoning:");
    for (i, line) in analysis.reasoning.iter().enumerate() {
        println!("  {}. {line}", i + 1);
    }

    if !analysis.risk_factors.is_empty() {
        println!();
        println!("Risk factors:");
        for risk in &analysis.risk_factors {
            println!("  - {risk}");
        }
    }
}

pub fn print_news(items: &[NewsItem]) {
    println!();
    println!("Latest headlines:");
    for item in items {
        println!(
            "  {} {} ({})",
            sentiment_tag(item.sentiment),
            item.title,
            item.source
        );
        println!("      {}", item.snippet);
        if let Some(url) = &item.url {
            println!("      {url}");
        }
    }
}

pub fn print_history_line(entry: &HistoryEntry) {
    println!(
        "{}  {}  {:<6} {:>4} ({:.0}%)",
        entry.id,
        entry.timestamp.format("%Y-%m-%d %H:%M"),
        entry.ticker,
        entry.analysis.recommendation.as_str(),
        entry.analysis.confidence_clamped()
    );
}

fn trend_arrow(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => "↑",
        Trend::Down => "↓",
        Trend::Neutral => "→",
    }
}

fn sentiment_tag(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "[+]",
        Sentiment::Negative => "[-]",
        Sentiment::Neutral => "[=]",
    }
}
