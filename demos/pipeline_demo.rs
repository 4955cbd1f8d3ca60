// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{json, Value};
use std::time::Duration;
use the_conduit::actions::{Action, CallbackResult};
use the_conduit::backends::local::{CountingSource, Passthrough, Tee, TestingSink};
use the_conduit::config::{Endpoint, LinkSpec, PipelineOptions, TopologySpec};
use the_conduit::engine::{observer, FlowMode, PadRef, Pipeline, PipelineNotice};
use the_conduit::observability::init_tracing;
use the_conduit::traits::{PipelineContext, PipelineModule};

/// Governs a fan-out pipeline: builds the topology, counts buffers per sink and
/// shuts the pipeline down once both sinks saw end of stream.
struct FanOut {
    received: u64,
    finished: u32,
}

impl PipelineModule for FanOut {
    fn handle_init(&mut self) -> CallbackResult {
        let spec = TopologySpec::new()
            .child("source", CountingSource::new(5))
            .child("filter", Passthrough::new())
            .child("tee", Tee::new().with_window(2))
            .child("left", TestingSink::new().with_mode(FlowMode::Push))
            .child("right", TestingSink::new().with_mode(FlowMode::Push))
            .link(LinkSpec::default_pads("source", "filter"))
            .link(LinkSpec::default_pads("filter", "tee"))
            .link(LinkSpec::new(
                Endpoint::new("tee", PadRef::dynamic("output", "left")),
                Endpoint::new("left", "input"),
            ))
            .link(LinkSpec::new(
                Endpoint::new("tee", PadRef::dynamic("output", "right")),
                Endpoint::new("right", "input"),
            ));
        CallbackResult::with_actions(vec![Action::Spec(spec)])
    }

    fn handle_notification(&mut self, notification: &Value, _element: &str, _ctx: &PipelineContext<'_>) -> CallbackResult {
        if notification.get("buffer").is_some() {
            self.received += 1;
        }
        CallbackResult::Ok
    }

    fn handle_element_end_of_stream(&mut self, element: &str, _pad: &PadRef, _ctx: &PipelineContext<'_>) -> CallbackResult {
        if element == "tee" {
            return CallbackResult::Ok;
        }
        self.finished += 1;
        if self.finished < 2 {
            return CallbackResult::Ok;
        }
        CallbackResult::with_actions(vec![
            Action::Notify(json!({ "received": self.received })),
            Action::Shutdown,
        ])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("=== Fan-out Pipeline Demo ===\n");

    let (observer, mut notices) = observer();
    let options = PipelineOptions::new("fan-out")
        .module(FanOut { received: 0, finished: 0 })
        .observer(observer);

    let pipeline = Pipeline::start(options)?;
    pipeline.play().await?;

    while let Some(notice) = notices.recv_timeout(Duration::from_secs(5)).await {
        match notice {
            PipelineNotice::Notification { element, payload } => println!("{:>6} <- {}", element, payload),
            PipelineNotice::ModuleNotification(summary) => println!("\nSummary: {}", summary),
            PipelineNotice::PlaybackChanged { from, to } => println!("playback: {} -> {}", from, to),
            PipelineNotice::Terminated => break,
            _ => {}
        }
    }

    pipeline.shutdown().await?;
    println!("\nPipeline terminated.");
    Ok(())
}
