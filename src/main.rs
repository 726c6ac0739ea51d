//! Reads pose frames (JSON lines) on stdin, classifies windows in the
//! background and writes one avatar record per tick to stdout.
//!
//! Usage: pose-pilot [config.toml]

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pose_pilot::avatar::AvatarParams;
use pose_pilot::classifier::ActionModel;
use pose_pilot::config::Config;
use pose_pilot::pipeline::{ActionSlot, AvatarTicker, FramePipeline};
use pose_pilot::scheduler::SchedulerStats;
use pose_pilot::stream::{self, AvatarRecord};

const CONFIG_PATH: &str = "pose_pilot.toml";

#[cfg(feature = "onnx")]
fn build_model(config: &Config) -> Box<dyn ActionModel> {
    Box::new(pose_pilot::classifier::OnnxActionModel::from_config(&config.model))
}

#[cfg(not(feature = "onnx"))]
fn build_model(_config: &Config) -> Box<dyn ActionModel> {
    use pose_pilot::classifier::FnModel;
    use pose_pilot::error::Error;
    Box::new(FnModel(|_: ndarray::Array3<f32>| -> pose_pilot::error::Result<Vec<f32>> {
        Err(Error::ModelUnavailable("built without the onnx feature".to_string()))
    }))
}

fn log_stats(stats: &SchedulerStats) {
    tracing::info!(
        "windows: submitted {} started {} replaced {} ok {} failed {} discarded {}, last latency {:?}",
        stats.submitted,
        stats.started,
        stats.replaced,
        stats.completed,
        stats.failed,
        stats.discarded,
        stats.last_latency
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pose_pilot=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    tracing::info!("pose-pilot ({})", env!("GIT_VERSION"));
    tracing::info!(
        "{} landmarks, {} features per frame, window {}, {} labels",
        config.landmarks.count,
        config.landmarks.feature_len(),
        config.window.size,
        config.model.labels.len()
    );
    tracing::info!("model: {}", config.model.path);

    let (mut pipeline, mut events) = FramePipeline::spawn(&config, build_model(&config));
    let slot = ActionSlot::new(config.min_confidence);
    let mut ticker = AvatarTicker::new(AvatarParams::from_config(&config.avatar), slot.subscribe());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let mut tick = interval(config.avatar.tick_period());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let stats_enabled = config.stats_interval_secs > 0;
    let mut stats_tick = interval(Duration::from_secs(config.stats_interval_secs.max(1)));
    stats_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut frames: u64 = 0;
    let result = async {
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line.context("failed to read stdin")? {
                        Some(line) => line,
                        None => {
                            tracing::info!("input closed after {} frames", frames);
                            break;
                        }
                    };
                    match stream::parse_frame(&line) {
                        Ok(Some(record)) => {
                            frames += 1;
                            pipeline.push_frame(&record.landmarks);
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!("bad frame line: {}", e),
                    }
                }
                Some(event) = events.recv() => {
                    slot.apply(&event);
                }
                _ = tick.tick() => {
                    let tick = ticker.tick();
                    let record = AvatarRecord::new(ticker.params(), &tick);
                    let mut out = record.to_line()?;
                    out.push('\n');
                    stdout.write_all(out.as_bytes()).await.context("failed to write stdout")?;
                    stdout.flush().await?;
                }
                _ = stats_tick.tick(), if stats_enabled => {
                    log_stats(&pipeline.stats());
                }
                _ = &mut ctrl_c => {
                    tracing::info!("interrupted");
                    break;
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    let stats = pipeline.stats();
    tokio::task::block_in_place(move || pipeline.shutdown());
    log_stats(&stats);
    tracing::info!("final label {}, avatar {:?}", slot.current(), ticker.state());

    result
}
