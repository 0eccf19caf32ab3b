use anyhow::Context;
use serde_json::json;
use so_optimizer::{Optimizer, SearchPoint, Value, DEFAULT_NUM_BOOST_ROUND};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// The benchmark's global minimum is -6.29.
const GLOBAL_MINIMUM_THRESHOLD: f64 = -6.289;

/// Synthetic objective over the benchmark space.
fn feval(point: &SearchPoint) -> anyhow::Result<f64> {
    let num = |name: &str| {
        point
            .get(name)
            .and_then(Value::as_f64)
            .with_context(|| format!("spoint {point} has no numeric '{name}'"))
    };
    let a = num("a")?;
    let b = num("b")?;
    let xc = match point.get("c") {
        Some(Value::Int(128)) => 0.7,
        Some(Value::Int(256)) => 0.72,
        Some(Value::Int(512)) => 0.68,
        Some(Value::Int(1024)) => 0.78,
        other => anyhow::bail!("unexpected c={other:?}"),
    };
    let xd = match point.get("d").and_then(Value::as_str) {
        Some("typeX") => -1.0,
        Some("typeY") => -2.0,
        Some("typeZ") => 0.0,
        other => anyhow::bail!("unexpected d={other:?}"),
    };
    let xe = if num("e")? > 0.5 { 0.1234 } else { 0.0 };
    let xa = (a - 5.0).abs() / 10.0;
    Ok((xa + b) * xc + xd + xe)
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name}={raw} could not be parsed")),
        Err(_) => Ok(default),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let seed: u64 = env_or("SPACEOPT_SEED", 123_456)?;
    let random_rounds: usize = env_or("SPACEOPT_RANDOM_ROUNDS", 10)?;
    let sample_size: usize = env_or("SPACEOPT_SAMPLE_SIZE", 1000)?;

    let space = so_optimizer::Space::from_json(&json!({
        "a": (0..=20).collect::<Vec<i64>>(),
        "b": [-5.5, -4.4, -3.3, -2.2, -1.1, 0.0, 1.1, 2.2, 3.3, 4.4, 5.5],
        "c": [128, 256, 512, 1024],
        "d": ["typeX", "typeY", "typeZ"],
        "e": [true, false],
        "f": [10000],
    }))?;
    let size = space.size();

    let mut optimizer = Optimizer::new(space, "y", "min")?.with_seed(seed);
    println!("{optimizer}");

    let mut best_y = f64::INFINITY;
    let mut iteration: u128 = 0;
    while iteration < size {
        iteration += 1;
        let (proposal, kind) = if iteration <= random_rounds as u128 {
            (optimizer.get_random(1, sample_size)?, "random")
        } else {
            (
                optimizer.fit_predict(1, DEFAULT_NUM_BOOST_ROUND, sample_size)?,
                "fit_predict",
            )
        };
        let point = proposal
            .into_single()
            .context("expected a single proposed spoint")?;

        let y = feval(&point)?;
        let evaluated = point.with("y", y);
        optimizer.append_evaluated_spoint(evaluated.clone())?;

        if y < best_y {
            best_y = y;
            info!(iteration = %iteration, y, kind, spoint = %evaluated, "new best");
        }

        if best_y < GLOBAL_MINIMUM_THRESHOLD {
            println!(
                "global minimum found after {iteration}/{size} evaluations ({:.4})",
                iteration as f64 / size as f64
            );
            return Ok(());
        }
    }

    println!("search space exhausted, best y={best_y}");
    Ok(())
}
