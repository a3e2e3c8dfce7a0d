use std::{sync::Arc, time::Duration};

use {
    anyhow::{Context, Result, bail},
    tracing::info,
};

use {
    streamwatch_common::Identity,
    streamwatch_config::StreamwatchConfig,
    streamwatch_discord::DiscordTransport,
    streamwatch_monitor::{
        EmbedNotifier, MonitorService, Reconciler,
        content::{PREVIEW_HEIGHT, PREVIEW_WIDTH},
    },
    streamwatch_store::{FileBackend, LiveCache},
    streamwatch_twitch::{HelixClient, HelixOptions},
};

use crate::config_commands::{Loaded, ensure_valid};

fn helix(config: &StreamwatchConfig) -> Result<HelixClient> {
    let twitch = &config.twitch;
    HelixClient::new(HelixOptions {
        client_id: twitch.client_id.clone(),
        client_secret: twitch.client_secret.clone(),
        api_base_url: twitch.api_base_url.clone(),
        auth_base_url: twitch.auth_base_url.clone(),
        timeout: Duration::from_secs(config.monitor.request_timeout_secs),
    })
    .context("building twitch client")
}

async fn build_service(loaded: &Loaded) -> Result<Arc<MonitorService>> {
    let config = &loaded.config;
    let source = Arc::new(helix(config)?);
    let transport = Arc::new(
        DiscordTransport::new(
            config.discord.token.clone(),
            config.discord.api_base_url.clone(),
            Duration::from_secs(config.monitor.request_timeout_secs),
        )
        .context("building discord transport")?,
    );
    let notifier = Arc::new(EmbedNotifier::new(transport, source.clone()));

    let cache_path = config.monitor.resolve_cache_path(&loaded.data_dir);
    let backend = Arc::new(FileBackend::new(cache_path.clone()));
    let cache = LiveCache::open(backend, config.monitor.grace_misses).await;

    let reconciler = Reconciler::new(config.route_table(), source, notifier, cache);
    info!(
        watched = reconciler.watched().len(),
        cached = reconciler.cache().len(),
        cache = %cache_path.display(),
        grace_misses = reconciler.cache().grace_threshold(),
        "monitor ready"
    );
    Ok(MonitorService::new(
        reconciler,
        Duration::from_secs(config.monitor.poll_interval_secs),
    ))
}

/// Watch until Ctrl-C.
pub async fn run(loaded: Loaded) -> Result<()> {
    ensure_valid(&loaded)?;
    let service = build_service(&loaded).await?;

    service.start().await;
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown requested");
    service.stop().await;

    let status = service.status().await;
    info!(ticks = status.ticks, "streamwatch stopped");
    Ok(())
}

/// Run a single tick and print its report.
pub async fn once(loaded: Loaded) -> Result<()> {
    ensure_valid(&loaded)?;
    let service = build_service(&loaded).await?;
    let report = service.run_now().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Ask the provider about `logins` and print which are live.
pub async fn probe(loaded: Loaded, logins: Vec<String>) -> Result<()> {
    let identities = logins
        .iter()
        .map(Identity::new)
        .collect::<Result<Vec<_>, _>>()?;
    if identities.is_empty() {
        bail!("no logins given");
    }

    let helix = helix(&loaded.config)?;
    let live = helix.live_streams(&identities).await?;

    for identity in &identities {
        match live.get(identity) {
            Some(record) => {
                println!("{identity}: LIVE  {}", record.title);
                println!("    {}", record.preview_url(PREVIEW_WIDTH, PREVIEW_HEIGHT));
            },
            None => println!("{identity}: offline"),
        }
    }
    println!("{}/{} live", live.len(), identities.len());
    Ok(())
}
