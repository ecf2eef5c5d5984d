mod config;
mod server;
mod tasks;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::Request;
use clap::Parser;
use dotenvy::dotenv;
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;
use crate::tasks::AutoPublish;
use crate::tasks::clock::{Clock, SystemClock};
use crate::tasks::commands::CommandHandler;
use crate::tasks::seen::{JsonFileStore, SeenStore};
use crate::tasks::sinks::Sink;
use crate::tasks::sinks::telegram::TelegramSink;
use crate::tasks::sources::FeedSource;
use crate::tasks::sources::rss::RssSource;
use crate::tasks::triggers::poll::FeedPoller;

#[derive(Parser)]
#[command(name = "feed-relay", about = "Relays new feed entries to a Telegram chat")]
enum Cli {
    /// Run the webhook server and the feed poller (default when no subcommand is given)
    #[command(alias = "run")]
    Serve {
        /// Start with automatic publishing switched off
        #[arg(long)]
        start_disabled: bool,
    },
    /// Run only the feed poller, without the webhook server
    Worker,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    // Default to Serve when no subcommand is given, but still allow --help
    // and --version to work.
    let args: Vec<String> = std::env::args().collect();
    let cli = if args.len() <= 1 {
        Cli::Serve { start_disabled: false }
    } else {
        Cli::parse()
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing();
    let _guard = sentry::init((
        config.sentry_dsn.clone().unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.environment.clone().into()),
            traces_sample_rate: 0.2,
            enable_logs: true,
            ..Default::default()
        },
    ));

    match cli {
        Cli::Serve { start_disabled } => run_server(config, start_disabled).await,
        Cli::Worker => run_worker(config).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feed_relay=info,tower_http=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true).with_bracketed_fields(false))
        .with(sentry::integrations::tracing::layer().event_filter(
            |metadata| match *metadata.level() {
                tracing::Level::ERROR => sentry::integrations::tracing::EventFilter::Event,
                tracing::Level::WARN | tracing::Level::INFO => {
                    sentry::integrations::tracing::EventFilter::Breadcrumb
                }
                _ => sentry::integrations::tracing::EventFilter::Ignore,
            },
        ))
        .init();
}

/// Components shared by the poller and the command handler.
struct Relay {
    source: Arc<dyn FeedSource>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    auto_publish: AutoPublish,
}

impl Relay {
    fn new(config: &Config, start_disabled: bool) -> Result<Self> {
        let http_client = Arc::new(
            reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(10))
                .build()
                .context("failed to build HTTP client")?,
        );

        Ok(Self {
            source: Arc::new(RssSource::new(http_client.clone(), config.feed_url.clone())),
            sink: Arc::new(TelegramSink::new(
                http_client,
                config.telegram_api_base.clone(),
                config.bot_token.clone(),
                config.chat_id.clone(),
            )),
            clock: Arc::new(SystemClock),
            auto_publish: AutoPublish::new(!start_disabled),
        })
    }

    async fn poller(&self, config: &Config) -> FeedPoller {
        let store: Arc<dyn SeenStore> = Arc::new(JsonFileStore::new(config.seen_file.clone()));
        FeedPoller::new(
            self.source.clone(),
            self.sink.clone(),
            store,
            self.clock.clone(),
            self.auto_publish.clone(),
            config.poll_interval,
            config.send_delay,
        )
        .await
    }
}

async fn run_server(config: Config, start_disabled: bool) -> Result<(), Box<dyn Error>> {
    let relay = Relay::new(&config, start_disabled)?;
    if start_disabled {
        tracing::info!("Starting with auto-publish disabled (--start-disabled)");
    }
    if config.uses_default_secret() {
        tracing::warn!("WEBHOOK_SECRET is not set; the webhook path uses the default secret");
    }

    let poller = relay.poller(&config).await;
    tokio::spawn(async move { poller.run_loop().await });

    let commands = CommandHandler::new(
        relay.source.clone(),
        relay.sink.clone(),
        relay.clock.clone(),
        relay.auto_publish.clone(),
    );
    let app_state = server::AppState {
        commands: Arc::new(commands),
        webhook_secret: Arc::from(config.webhook_secret.as_str()),
    };

    let app = server::create_app(app_state)
        .layer(SentryHttpLayer::new().enable_transaction())
        .layer(NewSentryLayer::<Request<Body>>::new_from_top());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(feed = %config.feed_url, "Listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_worker(config: Config) -> Result<(), Box<dyn Error>> {
    let relay = Relay::new(&config, false)?;
    tracing::info!(feed = %config.feed_url, "Starting poller without webhook server");
    relay.poller(&config).await.run_loop().await;
    Ok(())
}
