// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;
use std::env;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use the_conduit::config::{load_config, ElementRegistry, PipelineConfig};
use the_conduit::engine::{observer, Pipeline, PipelineNotice};
use the_conduit::observability::init_tracing;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

struct Args {
    config_file: String,
    timeout: Duration,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} <pipeline.yaml|pipeline.toml> [--timeout-seconds N]\n       {program} --describe"
    )
}

fn parse_args(args: &[String]) -> Result<Option<Args>> {
    let program = args.first().map(String::as_str).unwrap_or("the-conduit");
    let mut config_file = None;
    let mut timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECONDS);

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--describe" => return Ok(None),
            "--timeout-seconds" => {
                let value = rest.next().context("--timeout-seconds needs a value")?;
                let seconds: u64 = value
                    .parse()
                    .with_context(|| format!("invalid --timeout-seconds '{}'", value))?;
                timeout = Duration::from_secs(seconds);
            }
            other if config_file.is_none() => config_file = Some(other.to_string()),
            other => bail!("unexpected argument '{}'\n{}", other, usage(program)),
        }
    }

    match config_file {
        Some(config_file) => Ok(Some(Args { config_file, timeout })),
        None => bail!(usage(program)),
    }
}

/// Elements nothing links out of: the run is over once each of them saw end of stream.
fn terminal_elements(config: &PipelineConfig) -> BTreeSet<String> {
    match &config.links {
        None => config.elements.last().map(|e| e.name.clone()).into_iter().collect(),
        Some(links) => {
            let feeding: BTreeSet<&str> = links
                .iter()
                .filter_map(|link| link.from.split('.').next())
                .collect();
            config
                .elements
                .iter()
                .filter(|e| !feeding.contains(e.name.as_str()))
                .map(|e| e.name.clone())
                .collect()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let registry = ElementRegistry::with_builtins();
    let Some(args) = parse_args(&args)? else {
        println!("{}", registry.describe());
        return Ok(());
    };

    let config = load_config(&args.config_file)
        .with_context(|| format!("failed to load {}", args.config_file))?;
    let mut waiting = terminal_elements(&config);

    println!("🚀 The Conduit");
    println!("═══════════════════════════════════");
    println!("Pipeline: {}", config.name);
    println!("Elements: {}", config.elements.len());
    println!("Waiting for end of stream on: {:?}", waiting);
    println!();

    let (observer, mut notices) = observer();
    let options = config.into_options(&registry)?.observer(observer);
    let pipeline = Pipeline::start(options)?;

    let started = Instant::now();
    pipeline.play().await?;

    while !waiting.is_empty() {
        let remaining = args.timeout.saturating_sub(started.elapsed());
        let Some(notice) = notices.recv_timeout(remaining).await else {
            eprintln!("⏰ Timed out after {:?}, still waiting on {:?}", args.timeout, waiting);
            break;
        };

        match &notice {
            PipelineNotice::Notification { element, payload } => println!("📦 {}: {}", element, payload),
            PipelineNotice::EndOfStream { element, pad } => {
                println!("🏁 {} reached end of stream on {}", element, pad);
                waiting.remove(element);
            }
            PipelineNotice::ChildFailed { element, reason } => eprintln!("❌ {} failed: {}", element, reason),
            PipelineNotice::Failed { reason } => {
                eprintln!("❌ Pipeline failed: {}", reason);
                break;
            }
            PipelineNotice::Terminated => break,
            other => println!("ℹ️  {:?}", other),
        }
    }

    pipeline.stop().await.ok();
    pipeline.shutdown().await?;
    println!("\n🎉 Done in {:.2?}", started.elapsed());
    Ok(())
}
