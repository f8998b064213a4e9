//! Stream a single run to a writer, one JSON message per line

use springsim_core::{
    Broadcaster, Limits, RunConfig, RunManager, SimulationParameters, WireMessage,
};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// Frames buffered between the sampling loop and the writer
const STREAM_QUEUE_DEPTH: usize = 1024;

/// Validate `params`, run the simulation and write each frame to `out`.
///
/// Returns the number of data messages written. Stops after `max_samples`
/// data messages, or when `out` is closed by the reader.
pub fn stream_run<W: Write>(
    params: SimulationParameters,
    limits: Limits,
    config: RunConfig,
    max_samples: Option<u64>,
    mut out: W,
) -> Result<u64, Box<dyn std::error::Error>> {
    params.validate(&limits)?;

    let broadcaster = Arc::new(Broadcaster::new());
    let (_, frames) = broadcaster.subscribe_channel(STREAM_QUEUE_DEPTH);
    let manager = RunManager::new(config);

    let run = manager.request_simulation(params, limits, broadcaster)?;
    info!(run = %run, "streaming run");

    let mut written = 0;
    while max_samples.map_or(true, |max| written < max) {
        let frame = match frames.recv() {
            Ok(frame) => frame,
            Err(_) => break,
        };

        if let Err(err) = writeln!(out, "{}", frame).and_then(|_| out.flush()) {
            if err.kind() == io::ErrorKind::BrokenPipe {
                debug!("output closed by reader");
                break;
            }
            return Err(err.into());
        }

        if matches!(
            serde_json::from_str::<WireMessage>(&frame),
            Ok(WireMessage::Data { .. })
        ) {
            written += 1;
        }
    }

    manager.cancel();
    Ok(written)
}
