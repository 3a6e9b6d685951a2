// Native binary for scoutfeed - follows one explorer listing on stdout

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::unbounded_channel;

use scoutfeed::{
    action::PageLoad,
    channel::{run_channel, ChannelEvent},
    config::{load, Config},
    differ::DiffOptions,
    fetch::HttpPageSource,
    view::{EventSender, FeedEvent, ListView, UserCommand},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = load().context("Failed to load configuration")?;
    cfg.log_summary();

    let (tx, rx) = unbounded_channel::<FeedEvent>();

    let source = HttpPageSource::new(cfg.base_url.clone(), cfg.profile.decoder.clone())
        .with_timeout_ms(cfg.http_timeout_ms)
        .with_retries(cfg.http_retries);
    let mut view = ListView::new(
        cfg.profile.clone(),
        page_context(&cfg),
        std::sync::Arc::new(source),
        DiffOptions {
            animate: cfg.animate,
        },
        cfg.batch_config(),
        tx.clone(),
    );

    spawn_channel(&cfg, view.subscriptions(), tx.clone());
    spawn_stdin(tx.clone());
    spawn_ctrl_c(tx);

    print_lines(&view);
    view.start();
    view.run(rx, print_lines).await;
    log::info!("bye");
    Ok(())
}

fn page_context(cfg: &Config) -> PageLoad {
    PageLoad {
        listing_path: Some(cfg.listing_path.clone()),
        address_hash: cfg.address_hash.clone(),
        filter: Some(cfg.filter),
        next_page_path: cfg.next_page_path.clone(),
        ..PageLoad::default()
    }
}

fn spawn_channel(
    cfg: &Config,
    subscriptions: Vec<scoutfeed::channel::TopicSubscription>,
    tx: EventSender,
) {
    let ws_url = cfg.ws_url.clone();
    let (channel_tx, mut channel_rx) = unbounded_channel::<ChannelEvent>();
    tokio::spawn(async move {
        if let Err(e) = run_channel(&ws_url, subscriptions, channel_tx).await {
            log::error!("live channel ended: {e}");
        }
    });
    tokio::spawn(async move {
        while let Some(event) = channel_rx.recv().await {
            if tx.send(FeedEvent::Channel(event)).is_err() {
                break;
            }
        }
    });
}

fn spawn_stdin(tx: EventSender) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<UserCommand>() {
                Ok(command) => {
                    if tx.send(FeedEvent::Command(command)).is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("{e}"),
            }
        }
        let _ = tx.send(FeedEvent::Command(UserCommand::Quit));
    });
}

fn spawn_ctrl_c(tx: EventSender) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(FeedEvent::Command(UserCommand::Quit));
        }
    });
}

fn print_lines(view: &ListView<HttpPageSource>) {
    let state = view.state();
    let page = match state.page_number() {
        Some(n) => format!("page {n}"),
        None if state.beyond_page_one => "older".to_string(),
        None => "live".to_string(),
    };
    println!(
        "---- {} {} {} ----",
        chrono::Local::now().format("%H:%M:%S"),
        view.profile().name,
        page
    );
    for line in view.lines() {
        println!("{line}");
    }
}
