use nu_plugin::{serve_plugin, MsgPackSerializer};
use nu_plugin_medidores::config::LOG_ENV;
use nu_plugin_medidores::MedidoresPlugin;
use tracing_subscriber::EnvFilter;

fn main() {
    // stdout carries the plugin protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    serve_plugin(&MedidoresPlugin, MsgPackSerializer {})
}
