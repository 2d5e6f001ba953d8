use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use innolink::config;
use innolink::models::RealtimeMessage;
use innolink::realtime::{self, DeliveryMode, RealtimeHub};
use innolink::session;
use innolink::store::{AuditLog, FileTokenStore, TokenStore};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "innolink=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    match args.command {
        cli::Commands::Login { username, password } => {
            let session = session::init(&cfg).await?;
            match session.login(&username, &password).await {
                Ok(user) => {
                    println!("logged in as {} <{}>", user.username, user.email);
                    println!("roles: {}", user.roles);
                }
                Err(e) => {
                    eprintln!("login failed: {e}");
                    std::process::exit(1);
                }
            }
        }

        cli::Commands::Whoami => {
            let session = session::init(&cfg).await?;
            let snapshot = session.snapshot();
            match snapshot.user {
                Some(user) => {
                    println!("{} <{}>", user.username, user.email);
                    println!("roles: {}", user.roles);
                    if let Some(record) = FileTokenStore::new(&cfg.data_dir).load() {
                        let remaining = record.remaining(chrono::Utc::now());
                        println!(
                            "session expires in {}m {}s",
                            remaining.as_secs() / 60,
                            remaining.as_secs() % 60
                        );
                    }
                }
                None => println!("not logged in"),
            }
        }

        cli::Commands::Logout => {
            let session = session::init(&cfg).await?;
            session.logout().await;
            println!("logged out");
        }

        cli::Commands::Audit { limit } => {
            let entries = AuditLog::new(&cfg.data_dir).recent();
            let start = entries.len().saturating_sub(limit);
            for entry in &entries[start..] {
                println!(
                    "{} {} project={} user={} agent={}",
                    entry.timestamp.to_rfc3339(),
                    if entry.success { "ALLOW" } else { "DENY " },
                    entry.project_id,
                    entry.username.as_deref().unwrap_or("-"),
                    entry.user_agent,
                );
            }
        }

        cli::Commands::Watch { delivery_id } => {
            let hub = RealtimeHub::new(
                DeliveryMode::Polling,
                cfg.data_dir.clone(),
                cfg.poll_interval,
            );
            let channel = realtime::feedback_channel(&delivery_id);
            let _subscription = hub.subscribe(&channel, |msg| {
                println!(
                    "[{}] {:?}: {}",
                    msg.timestamp.to_rfc3339(),
                    msg.kind,
                    msg.data
                );
            });
            println!("watching {channel} (ctrl-c to stop)");
            tokio::signal::ctrl_c().await?;
        }

        cli::Commands::Post { delivery_id, text } => {
            let hub = RealtimeHub::new(
                DeliveryMode::Polling,
                cfg.data_dir.clone(),
                cfg.poll_interval,
            );
            let channel = realtime::feedback_channel(&delivery_id);
            let subscription = hub.subscribe(&channel, |_| {});
            subscription.broadcast(RealtimeMessage::comment(json!({ "text": text })));
            println!("posted to {channel}");
        }
    }

    Ok(())
}
