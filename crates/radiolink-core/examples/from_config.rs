//! Example: Opening Devices Declared in a Configuration File
//!
//! Loads a registry configuration from TOML, validates it, and opens every
//! device it declares.
//!
//! Run with: `cargo run --example from_config -- [CONFIG_PATH]`
//!
//! Without a path a built-in configuration is used.

use std::env;

use radiolink_core::mock::{MockI2cPort, MockUartPort};
use radiolink_core::{DeviceRegistry, RegistryConfig};
use tracing_subscriber::EnvFilter;

const BUILTIN: &str = r#"
[capacity]
devices = 8

[families]
short_range_open_cpu = false

[[devices]]
device_type = "cell"
transport = { type = "uart", uart = 1, baud_rate = 115200 }
device = { family = "cell", module_type = 1 }

[[devices]]
device_type = "gnss"
transport = { type = "i2c", bus = 0, clock_hertz = 400000 }
device = { family = "gnss" }

[[devices]]
device_type = "short_range"
transport = { type = "uart", uart = 2 }
device = { family = "short_range" }
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match env::args().nth(1) {
        Some(path) => RegistryConfig::load_validated(path)?,
        None => {
            let config: RegistryConfig = toml::from_str(BUILTIN)?;
            config.validate()?;
            config
        }
    };

    let registry = DeviceRegistry::new(config, MockI2cPort::new(), MockUartPort::new());
    registry.init()?;

    let handles = registry.open_configured()?;
    println!("Opened {} devices:", handles.len());
    for handle in &handles {
        println!(
            "  {}  {} (module {})",
            handle,
            registry.device_type(*handle)?,
            registry.module_type(*handle)?
        );
    }
    println!(
        "Location services: {}",
        if registry.is_location_available() { "available" } else { "unavailable" }
    );

    registry.deinit()?;
    Ok(())
}
