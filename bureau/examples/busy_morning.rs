//! A full morning at the bureaucracy building.
//!
//! Five customers chase interdependent documents across four offices while
//! the offices take coffee breaks on their own schedule.
//!
//! Run with:
//! ```bash
//! cargo run --example busy_morning
//! ```

use std::time::Duration;

use bureau::{CustomerProfile, SimulationBuilder, SimulationConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bureau=info".into()),
        )
        .with_target(false)
        .init();

    let customers = vec![
        CustomerProfile::new(
            "Mara",
            vec!["BUSINESS_LICENSE".to_string()],
            Duration::ZERO,
        ),
        CustomerProfile::new(
            "Ion",
            vec!["RESIDENCE_CERTIFICATE".to_string()],
            Duration::ZERO,
        ),
        CustomerProfile::new(
            "Alex",
            vec!["TAX_CLEARANCE".to_string(), "HEALTH_CARD".to_string()],
            Duration::ZERO,
        ),
        CustomerProfile::new("Dana", vec!["ID_CARD".to_string()], Duration::ZERO),
        CustomerProfile::new(
            "Vlad",
            vec!["BUSINESS_LICENSE".to_string()],
            Duration::from_millis(500),
        ),
    ];

    let simulation = SimulationBuilder::new(SimulationConfig::sample(), customers).build();
    simulation.run().await?;
    simulation.shutdown().await;
    Ok(())
}
