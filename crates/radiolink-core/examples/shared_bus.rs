//! Example: Sharing One I2C Bus Between Devices
//!
//! Opens two GNSS receivers on the same I2C bus and shows that the bus is
//! opened once, reference counted, and closed with the last device.
//!
//! Run with: `RUST_LOG=debug cargo run --example shared_bus`

use radiolink_core::mock::{MockI2cPort, MockUartPort};
use radiolink_core::{DeviceRegistry, RegistryConfig};
use radiolink_types::{DeviceConfig, DeviceType, I2cConfig, TransportConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let i2c = MockI2cPort::new();
    let registry = DeviceRegistry::new(RegistryConfig::default(), i2c.clone(), MockUartPort::new());
    registry.init()?;

    let cfg = DeviceConfig::defaults(DeviceType::Gnss).with_transport(TransportConfig::I2c(
        I2cConfig {
            bus: 0,
            clock_hertz: 100_000,
            ..Default::default()
        },
    ));

    let first = registry.open(&cfg)?;
    let second = registry.open(&cfg)?;
    println!("Opened {} and {}", first, second);

    if let Some(resource) = registry.i2c_resource(0) {
        println!(
            "Bus {} is {} with {} users",
            resource.bus, resource.port, resource.open_count
        );
    }

    registry.close(first, false)?;
    println!(
        "After closing {}: {} users, {} ports open",
        first,
        registry.i2c_resource(0).map_or(0, |r| r.open_count),
        i2c.open_port_count()
    );

    registry.close(second, false)?;
    println!(
        "After closing {}: bus entry {}, {} ports open",
        second,
        if registry.i2c_resource(0).is_some() { "kept" } else { "cleared" },
        i2c.open_port_count()
    );

    registry.deinit()?;
    Ok(())
}
