// Diagnose a saved classifier output
//
// Usage: cargo run --bin diagnose_vector -- <probabilities.json> [user_id]
// The file holds a JSON array of probabilities in label-set order.

use anyhow::Context;
use plant_diagnosis_rust::{AppConfig, Anonymous, Session, UserSession};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plant_diagnosis_rust=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(p) => PathBuf::from(p),
        None => anyhow::bail!("Usage: diagnose_vector <probabilities.json> [user_id]"),
    };
    let session: Box<dyn Session> = match args.next() {
        Some(user) => Box::new(UserSession::new(user)),
        None => Box::new(Anonymous),
    };

    let contents = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let probabilities: Vec<f64> =
        serde_json::from_str(&contents).with_context(|| format!("{} is not a JSON array of numbers", path.display()))?;

    let config = AppConfig::load()?;
    let diagnoser = config.build_diagnoser()?;

    let outcome = diagnoser.diagnose_probabilities(&probabilities, session.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
