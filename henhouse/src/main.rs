//! Henhouse - run a flow against a seeded in-memory store

use clap::Parser;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use henhouse::{
    audit::AuditLogger,
    auth::{AuthorizationGuard, IdentityDirectory},
    config::{Args, HenhouseConfig},
    db::{seed::Seed, MemoryStore, ReliableWriter},
    events::{ErrorEvent, ErrorEventChannel, EventName},
    flow::{FlowRegistry, FlowRunner, Services},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("henhouse={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Argument error: {}", e);
        std::process::exit(2);
    }

    let mut registry = FlowRegistry::standard()?;

    if args.list {
        for flow in registry.iter() {
            println!(
                "{:<24} {:<10} {}",
                flow.name(),
                if flow.is_privileged() { "admin" } else { "open" },
                flow.on_handler_error()
            );
        }
        return Ok(());
    }

    let config = HenhouseConfig::load(&args.config)?;
    if let Err(e) = config.validate(&registry) {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }
    config.apply_overrides(&mut registry)?;

    // Store and identities
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(IdentityDirectory::new());
    if let Some(path) = &args.seed {
        Seed::load(path)?.apply(&store, &directory)?;
    } else {
        warn!("No seed file given, starting with an empty store");
    }

    // Error channel with a logging observer
    let events = Arc::new(ErrorEventChannel::with_max_subscribers(
        config.events.max_subscribers,
    ));
    events.subscribe(EventName::PermissionError, |event| {
        let ErrorEvent::PermissionError(err) = event;
        warn!(
            path = %err.path(),
            operation = %err.operation(),
            "permission-error: {}",
            err.message
        );
    })?;

    let provider = config.build_provider(&args)?;
    match &provider {
        Some(p) => info!(provider = %p.id(), "Generative provider configured"),
        None => warn!("No generative provider configured; advisory flows will fail"),
    }

    let services = Services {
        provider,
        store: store.clone(),
        writer: ReliableWriter::new(store.clone(), events.clone()),
        audit: AuditLogger::new(store.clone()),
    };
    let guard = AuthorizationGuard::new(directory, config.admin_policy());
    let runner = FlowRunner::new(registry, guard, services);

    let flow = args.flow.as_deref().unwrap_or_default();
    let input: Value = serde_json::from_str(&args.input)?;

    match runner.run(flow, input).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(kind = ?e.kind(), "{}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
