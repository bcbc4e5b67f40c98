//! Foreground fleet runner.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use roost_core::error::format_error_with_suggestion;
use roost_core::{Config, Event, Store, TimestampedEvent};
use roost_session::{FleetManager, LoopbackConnector};

/// Start the named bots (or every stored account) and stream their events
/// to stdout until ctrl-c.
pub async fn handle(config: &Config, names: Vec<String>) -> anyhow::Result<()> {
    let store = Store::open(config.data_dir()).await?;
    let names = if names.is_empty() {
        store
            .accounts()
            .await?
            .into_iter()
            .map(|a| a.username)
            .collect()
    } else {
        names
    };
    if names.is_empty() {
        anyhow::bail!("No accounts stored; add one with `roost accounts add`");
    }

    let connector = Arc::new(LoopbackConnector::new());
    let manager = FleetManager::new(config.clone(), store, connector);
    let mut events = manager.subscribe();

    for name in &names {
        if let Err(e) = manager.start(name).await {
            eprintln!("{}", format_error_with_suggestion(&e.into()));
        }
    }

    info!(bots = names.len(), "Fleet running, ctrl-c to stop");
    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Ok(ev) => print_event(&TimestampedEvent::now(ev)),
                Err(RecvError::Lagged(n)) => eprintln!("... {} events dropped", n),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    manager.shutdown().await;
    info!("Fleet stopped");
    Ok(())
}

fn print_event(ev: &TimestampedEvent) {
    let stamp = ev.at.with_timezone(&Local).format("%H:%M:%S");
    match &ev.event {
        Event::Status {
            identity,
            status,
            message,
        } => println!("[{}] {} [{}] {}", stamp, identity, status, message),
        Event::Chat {
            identity,
            username,
            text,
        } => println!("[{}] {} <{}> {}", stamp, identity, username, text),
        Event::Error { identity, message } => {
            println!("[{}] {} error: {}", stamp, identity, message)
        }
        Event::Reconnecting { identity } => {
            println!("[{}] {} reconnecting...", stamp, identity)
        }
    }
}
