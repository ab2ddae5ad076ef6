//! Prometheus exporter for SIPIS instance statistics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use sipis_exporter::config::LogFormat;
use sipis_exporter::{
    ConfigOverrides, ExporterConfig, GaugeSet, HttpServer, SampleCollector, Scheduler,
    StatsFetcher, init_tracing,
};

/// Prometheus exporter for SIPIS.
#[derive(Parser, Debug)]
#[command(name = "sipis-exporter")]
#[command(about = "Export SIPIS instance statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The address to listen on for HTTP requests [default: :8080].
    #[arg(long = "listen-address", env = "SIPIS_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Instance URL (can be specified multiple times).
    #[arg(long = "instance")]
    instances: Vec<String>,

    /// Comma-separated instance URLs, merged with --instance.
    #[arg(long = "instances", env = "SIPIS_INSTANCES", hide = true)]
    instance_list: Option<String>,

    /// Update interval, e.g. "15m" or "30s" [default: 15m].
    #[arg(long, env = "SIPIS_EVERY")]
    every: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SIPIS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen: self.listen_address.clone(),
            instances: self.instances.clone(),
            instance_list: self.instance_list.clone(),
            every: self.every.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ExporterConfig::resolve(args.config.as_deref(), args.overrides())?;

    init_tracing(&config.logging)?;

    info!("Starting SIPIS Prometheus Exporter");

    let interval = config.interval()?;
    let listen_addr = config.listen_addr()?;

    let gauges = Arc::new(GaugeSet::new());
    let fetcher = StatsFetcher::new(config.request_timeout())?;
    let collector = Arc::new(SampleCollector::new(fetcher, gauges.clone()));

    // Bind first: an unavailable port is fatal and should fail before polling
    let http_server = HttpServer::bind(
        collector.clone(),
        listen_addr.as_str(),
        config.prometheus.path.clone(),
    )
    .await
    .inspect_err(|e| error!(error = %e, "Cannot start exposition endpoint"))?;

    for instance in &config.sipis.instances {
        info!(instance = %instance, "Configured instance");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = Scheduler::new(collector.clone(), config.sipis.instances.clone(), interval);
    let scheduler_task = scheduler.start(shutdown_rx.clone()).await;

    let http_shutdown = shutdown_rx.clone();
    let mut http_task = tokio::spawn(async move { http_server.run(http_shutdown).await });

    let http_failed = tokio::select! {
        result = &mut http_task => {
            match result {
                Ok(Ok(())) => error!("HTTP server exited unexpectedly"),
                Ok(Err(e)) => error!(error = %e, "HTTP server error"),
                Err(e) => error!(error = %e, "HTTP server task failed"),
            }
            true
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            false
        }
        _ = async {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to install SIGTERM handler");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
            false
        }
    };

    // Signal shutdown
    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = scheduler_task.await;
        if !http_failed {
            let _ = http_task.await;
        }
    })
    .await;

    let stats = collector.stats();
    info!(
        cycles_completed = stats.cycles_completed,
        samples_collected = stats.samples_collected,
        samples_failed = stats.samples_failed,
        series_count = gauges.series_count(),
        "Final statistics"
    );

    if http_failed {
        anyhow::bail!("exposition endpoint stopped");
    }

    info!("Exporter stopped");
    Ok(())
}
