use std::time::Duration;

use clap::Parser;
use gpio_monitoring::{
    SensorRecord,
    actors::bridge::BridgeHandle,
    bus::{BusClient, Metric, memory::MemoryBroker},
    config::read_config_file,
    gpio::SimulatedGpio,
    registry::SensorRegistry,
    util,
};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Log every metric arriving on the publish stream
    #[arg(long)]
    watch: bool,
}

fn log_filter() -> filter::Targets {
    // The second target is this binary's crate name, so the watcher's
    // metric lines and the supervisor logs pass the filter.
    filter::Targets::new().with_targets(vec![
        ("gpio_monitoring", LevelFilter::TRACE),
        ("gpio_agent", LevelFilter::TRACE),
    ])
}

fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(log_filter())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let name = config.name.clone().unwrap_or_else(util::get_agent_name);
    let endpoint = config.endpoint.clone().unwrap_or_else(util::get_endpoint);

    let broker = MemoryBroker::new();
    let gpio = SimulatedGpio::new();
    let registry = SensorRegistry::shared();

    {
        let mut registry = registry.write().await;
        for seed in &config.sensors {
            let ext_name = seed
                .ext_name
                .clone()
                .unwrap_or_else(|| format!("GPIO-Sensor-{}", seed.gpx_number));
            registry.upsert(SensorRecord::new(
                seed.gpx_number,
                seed.asset_name.clone(),
                ext_name,
            ));
            gpio.set_pin(config.base_index.saturating_add(seed.gpx_number), seed.pin_state);
        }
    }
    debug!(sensors = config.sensors.len(), "seeded sensor registry");

    if args.watch {
        spawn_watcher(&broker, &endpoint, &config.metrics_stream).await?;
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for interrupt: {e}");
                return;
            }
            debug!("interrupt received, shutting down");
            shutdown.cancel();
        });
    }

    let (bridge, task) = BridgeHandle::spawn(
        name,
        config.ttl,
        Box::new(broker.client()),
        Box::new(gpio),
        registry,
        shutdown.clone(),
    );

    bridge.connect(&endpoint).await?;
    bridge.producer(&config.metrics_stream).await?;
    for consumer in &config.consumers {
        bridge.consumer(&consumer.stream, &consumer.pattern).await?;
    }
    bridge.gpio_chip_address(config.base_index).await?;
    if config.verbose {
        bridge.verbose().await?;
    }

    let mut ticker = interval(Duration::from_secs(config.poll_interval));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            _ = ticker.tick() => {
                if let Err(e) = bridge.update().await {
                    error!("bridge actor is gone: {e:#}");
                    break;
                }
            }
        }
    }

    let _ = bridge.terminate().await;
    task.await?;
    broker.shut_down();

    Ok(())
}

/// Attach a second bus client that logs everything the agent publishes.
async fn spawn_watcher(
    broker: &MemoryBroker,
    endpoint: &str,
    stream: &str,
) -> anyhow::Result<()> {
    let mut watcher = broker.client();
    watcher.connect(endpoint, "metric-watcher").await?;
    watcher.set_consumer(stream, ".*").await?;

    tokio::spawn(async move {
        while let Some(delivery) = watcher.recv().await {
            match Metric::decode(&delivery.frames) {
                Ok(metric) => info!(
                    topic = %delivery.subject,
                    value = %metric.value,
                    ttl = metric.ttl,
                    "metric"
                ),
                Err(err) => error!(subject = %delivery.subject, "undecodable metric: {err}"),
            }
        }
        debug!("watcher inbox closed");
    });

    Ok(())
}
