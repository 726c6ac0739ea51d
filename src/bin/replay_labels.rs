//! Replays a recorded label sequence through the avatar physics and prints
//! every state. Same input, same output.
//!
//! Labels are separated by whitespace or commas; `#` starts a comment.
//! `-` reads stdin.

use std::env;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use pose_pilot::avatar::{self, AvatarParams};
use pose_pilot::classifier::ActionLabel;
use pose_pilot::config::Config;
use pose_pilot::pipeline::Tick;
use pose_pilot::stream::AvatarRecord;

const USAGE: &str = "usage: replay_labels [--config <file>] [--json] [--settle] <labels.txt|->";

struct ReplayOptions {
    config: Option<PathBuf>,
    json: bool,
    /// Keep ticking idle until the avatar is back on the ground
    settle: bool,
}

fn parse_args() -> Result<(String, ReplayOptions)> {
    let mut opts = ReplayOptions {
        config: None,
        json: false,
        settle: false,
    };
    let mut input: Option<String> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => opts.json = true,
            "--settle" => opts.settle = true,
            "--config" => {
                let path = args.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                opts.config = Some(PathBuf::from(path));
            }
            _ => {
                if input.is_some() {
                    bail!(USAGE);
                }
                input = Some(arg);
            }
        }
    }

    let input = input.ok_or_else(|| anyhow!(USAGE))?;
    Ok((input, opts))
}

fn read_labels(source: &str) -> Result<Vec<ActionLabel>> {
    let text = if source == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {}", source))?
    };

    let mut labels = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("");
        for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let label = token
                .parse::<ActionLabel>()
                .with_context(|| format!("line {}", line_no + 1))?;
            labels.push(label);
        }
    }
    Ok(labels)
}

fn main() -> Result<()> {
    let (source, opts) = parse_args()?;
    let config = match &opts.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let params = AvatarParams::from_config(&config.avatar);
    let labels = read_labels(&source)?;

    let mut state = params.initial_state();
    let mut index: u64 = 0;
    let mut emit = |label: ActionLabel, state: &avatar::AvatarState| -> Result<()> {
        index += 1;
        let tick = Tick {
            index,
            label,
            state: *state,
        };
        if opts.json {
            println!("{}", AvatarRecord::new(&params, &tick).to_line()?);
        } else {
            println!(
                "{:>5}  {:<10} x {:>7.1}  y {:>7.1}  vy {:>6.1}  {}",
                tick.index,
                label.as_str(),
                state.x,
                state.y,
                state.vy,
                if state.jumping { "air" } else { "ground" }
            );
        }
        Ok(())
    };

    for label in &labels {
        state = avatar::step(&params, &state, *label);
        emit(*label, &state)?;
    }

    if opts.settle {
        while state.jumping {
            state = avatar::step(&params, &state, ActionLabel::Idle);
            emit(ActionLabel::Idle, &state)?;
        }
    }

    if !opts.json {
        println!("\n{} labels, final state {:?}", labels.len(), state);
    }
    Ok(())
}
