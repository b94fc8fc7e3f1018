//! Audio setup: the engine lives inside the cpal callback and talks to the
//! UI thread over lock-free rings.

use std::sync::Arc;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{PushError, RingBuffer};
use stepfx::{
    graph::FxGraph,
    synth::EngineMessage,
    Engine, EngineConfig, MAX_BLOCK_SIZE,
};

use super::demo;
use super::ui::{StatusUpdate, UiApp};

const CONTROL_RING: usize = 64;
const STATUS_RING: usize = 32;
const SCOPE_RING: usize = 1024 * 16;

pub fn run(mut config: EngineConfig, graph: FxGraph) -> EyreResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let stream_config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    config.sample_rate = stream_config.sample_rate().0 as f32;
    let channels = stream_config.channels() as usize;

    let song = Arc::new(demo::song());
    let mut engine = Engine::init(config).wrap_err("failed to start engine")?;
    engine.set_row_source(Box::new(demo::scales()));
    engine.set_song(Arc::clone(&song));
    let outcome = engine.set_graph(graph);
    tracing::info!(?outcome, "initial graph applied");

    let (control_tx, mut control_rx) = RingBuffer::<EngineMessage>::new(CONTROL_RING);
    let (mut status_tx, status_rx) = RingBuffer::<StatusUpdate>::new(STATUS_RING);
    let (mut scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_RING);

    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
    let initial = StatusUpdate::from_engine(&engine, 0.0);

    let stream = device.build_output_stream(
        &stream_config.into(),
        move |data: &mut [f32], _| {
            engine.drain_messages(&mut control_rx);

            let total_frames = data.len() / channels;
            let mut frames_written = 0;
            let mut peak = 0.0f32;
            while frames_written < total_frames {
                let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let block = &mut render_buf[..frames_to_render];
                engine.render(block);

                let out_off = frames_written * channels;
                for (i, &s) in block.iter().enumerate() {
                    peak = peak.max(s.abs());
                    for ch in 0..channels {
                        data[out_off + i * channels + ch] = s;
                    }
                }

                for &s in block.iter() {
                    if let Err(PushError::Full(_)) = scope_tx.push(s) {
                        break;
                    }
                }
                frames_written += frames_to_render;
            }

            let _ = status_tx.push(StatusUpdate::from_engine(&engine, peak));
        },
        |err| tracing::error!(%err, "audio stream error"),
        None,
    )?;
    stream.play()?;

    let terminal = ratatui::init();
    let mut app = UiApp::new(control_tx, status_rx, scope_rx, song, initial);
    let res = app.run(terminal);
    ratatui::restore();
    res
}
