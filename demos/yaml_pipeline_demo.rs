// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::time::Duration;
use the_conduit::config::{load_config, ElementRegistry};
use the_conduit::engine::{observer, Pipeline, PipelineNotice};

/// Run a pipeline described by a YAML or TOML file.
/// Usage: cargo run --example yaml_pipeline_demo [config_file]
async fn run_yaml_pipeline_demo(config_file: String) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Config-Driven Pipeline Demo ===\n");

    println!("Loading configuration from {}...", config_file);
    let config = load_config(&config_file)?;
    println!("- Pipeline: {}", config.name);
    println!("- Failure strategy: {:?}", config.failure_strategy);
    for element in &config.elements {
        println!("- {} ({})", element.name, element.kind);
    }

    let (observer, mut notices) = observer();
    let options = config
        .into_options(&ElementRegistry::with_builtins())?
        .observer(observer);
    let pipeline = Pipeline::start(options)?;

    println!("\nPlaying...");
    pipeline.play().await?;

    while let Some(notice) = notices.recv_timeout(Duration::from_secs(2)).await {
        match notice {
            PipelineNotice::Notification { element, payload } => println!("  {} <- {}", element, payload),
            PipelineNotice::EndOfStream { element, pad } => println!("  {} finished on {}", element, pad),
            PipelineNotice::ChildFailed { element, reason } => println!("  {} failed: {}", element, reason),
            _ => {}
        }
    }

    println!("\nStopping...");
    pipeline.stop().await?;
    pipeline.shutdown().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let config_file = env::args()
        .nth(1)
        .unwrap_or_else(|| "configs/demo.yaml".to_string());

    if let Err(e) = run_yaml_pipeline_demo(config_file).await {
        eprintln!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
