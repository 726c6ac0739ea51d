use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use pose_pilot::classifier::{ActionClassifier, LabelSet, OnnxActionModel};
use pose_pilot::config::Config;
use pose_pilot::window::{FeatureVector, Window};

fn main() -> Result<()> {
    let mut config_path: Option<String> = None;
    let mut iterations: usize = 100;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            "--iterations" | "-n" => {
                let value = args.next().ok_or_else(|| anyhow!("{} needs a number", arg))?;
                iterations = value.parse().with_context(|| format!("bad iteration count {}", value))?;
            }
            other => anyhow::bail!("unknown argument {}", other),
        }
    }
    let config = match config_path {
        Some(path) => Config::load(&path)?,
        None => Config::load_or_default("pose_pilot.toml")?,
    };

    let feature_len = config.landmarks.feature_len();
    let model = OnnxActionModel::open(&config.model.path)?;
    let mut classifier = ActionClassifier::new(model, LabelSet::new(config.model.labels.clone()))
        .with_input_shape(config.window.size, feature_len);

    let rows = vec![FeatureVector::new(vec![0.0; feature_len]); config.window.size];
    let window = Window::from_rows(&rows)?;

    // first run includes session warm-up
    let warmup = Instant::now();
    let first = classifier.classify(&window)?;
    println!("Warm-up: {:.2}ms -> {} ({:.3})", ms(warmup.elapsed()), first.label, first.confidence);

    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let start = Instant::now();
        classifier.classify(&window)?;
        samples.push(start.elapsed());
    }
    samples.sort();

    if samples.is_empty() {
        return Ok(());
    }
    let total: Duration = samples.iter().sum();
    let avg_ms = ms(total) / samples.len() as f64;
    let p50 = ms(samples[samples.len() / 2]);
    let p95 = ms(samples[(samples.len() * 95 / 100).min(samples.len() - 1)]);

    println!(
        "Classifier: {:.2}ms avg, p50 {:.2}ms, p95 {:.2}ms over {} runs = {:.1} windows/s",
        avg_ms,
        p50,
        p95,
        samples.len(),
        1000.0 / avg_ms
    );
    Ok(())
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
