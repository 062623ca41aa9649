pub mod config;
pub mod error;
pub mod ops;
pub mod pipeline;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "plugin")]
pub mod commands;

pub use error::{Error, Result};

#[cfg(feature = "plugin")]
use nu_plugin::{Plugin, PluginCommand};

#[cfg(feature = "plugin")]
pub struct MedidoresPlugin;

#[cfg(feature = "plugin")]
impl Plugin for MedidoresPlugin {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").into()
    }

    fn commands(&self) -> Vec<Box<dyn PluginCommand<Plugin = Self>>> {
        vec![
            Box::new(commands::Normalize),
            Box::new(commands::Filter),
            Box::new(commands::Metrics),
            Box::new(commands::Top),
            Box::new(commands::Sort),
            Box::new(commands::Page),
            Box::new(commands::Export),
        ]
    }
}
