use color_eyre::Result;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

const CRATES: [&str; 5] = [
    "conoha_exporter",
    "conoha_client",
    "conoha_collector",
    "conoha_exporter_config",
    "conoha_exporter_http",
];

/// `RUST_LOG` wins; otherwise our crates log at `info`, or `debug` with `--verbose`.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(verbose))?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;
    Ok(())
}

fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    std::iter::once("warn".to_string())
        .chain(CRATES.iter().map(|krate| format!("{krate}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_our_crates_only() {
        assert_eq!(
            default_directives(false),
            "warn,conoha_exporter=info,conoha_client=info,conoha_collector=info,\
             conoha_exporter_config=info,conoha_exporter_http=info"
        );
        assert!(default_directives(true).starts_with("warn,conoha_exporter=debug,"));
        assert!(EnvFilter::try_new(default_directives(true)).is_ok());
    }
}
