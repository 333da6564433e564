use almanac_app::config::{expansion_options, load_config, parse_options, source_paths};
use almanac_app::load::{collect_records, load_all};
use chrono::{TimeDelta, Utc};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("info"));

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            ),
    )?;
    tracing_log::LogTracer::init()?;

    let config = load_config()?;

    tracing::debug!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping info");
    }

    let paths = source_paths(&config, std::env::args().skip(1).collect());
    if paths.is_empty() {
        anyhow::bail!("no calendar files given; pass paths or set source.paths");
    }

    let expansion = expansion_options(&config);
    let from = Utc::now();
    let until = from + TimeDelta::days(i64::from(expansion.lookahead_days));

    let mut documents = Vec::with_capacity(paths.len());
    for (path, result) in load_all(&paths, parse_options(&config)).await {
        match result {
            Ok(document) => documents.push(document),
            Err(error) => tracing::error!(path = %path.display(), %error, "Skipping calendar"),
        }
    }

    tracing::info!(
        loaded = documents.len(),
        requested = paths.len(),
        %from,
        %until,
        "Expanding calendars"
    );

    let records = collect_records(&documents, from, until, &expansion)?;
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}
