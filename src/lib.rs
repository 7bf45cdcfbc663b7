#[macro_use]
extern crate tracing;

mod app;
mod logging;

pub use app::{
    serve,
    App,
};
use color_eyre::Result;
pub use conoha_exporter_config::{
    Args,
    Config,
};
pub use logging::init_logging;

pub fn init_errors() -> Result<()> {
    color_eyre::install()
}
