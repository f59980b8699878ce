//! Run with `MOE_API_KEY` and `GOOGLE_API_KEY` set and `AIRBOX_CONFIG` pointing at a
//! TOML file that maps station ids to their pollution endpoints:
//!
//! ```sh
//! AIRBOX_CONFIG=airbox.toml RUST_LOG=info cargo run --example query_address -- "臺北市中正區重慶南路一段122號"
//! ```

use airbox::{Airbox, AirboxConfig, AirboxError};
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), AirboxError> {
    tracing_subscriber::fmt::init();

    let config = match env::var_os("AIRBOX_CONFIG") {
        Some(path) => AirboxConfig::load(&PathBuf::from(path))?,
        None => AirboxConfig::from_env(),
    };
    let address = env::args()
        .nth(1)
        .unwrap_or_else(|| "臺北市中正區重慶南路一段122號".to_string());

    let airbox = Airbox::new(config)?;
    let report = airbox.query(&address).await?;

    println!("{}", report.summary());
    println!(
        "{} PM2.5, {} temperature, {} humidity records (pollution run: {})",
        report.pollution.len(),
        report.temperature.len(),
        report.humidity.len(),
        report.pollution_stop
    );
    println!("Plots: {}", airbox.plot_path("total")?.display());

    Ok(())
}
