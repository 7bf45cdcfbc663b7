use clap::Parser;
use color_eyre::Result;
use conoha_exporter::{
    init_errors,
    init_logging,
    App,
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    init_logging(args.verbose)?;
    let config = Config::new(args)?;
    App::new(config)?.run().await
}
