use std::f32::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    buffer::{SampleBuffer, seconds_to_frame},
    config::EngineConfig,
    engine::Engine,
    error::EngineError,
    grid::{DEFAULT_DIVISION, Grid},
    model::DEFAULT_SAMPLE_RATE,
};

pub const DEMO_BPM: f64 = 120.0;
pub const DEMO_BARS: u32 = 2;
pub const DEMO_SEED: u64 = 0x5EED_100B;

/// Sine at `frequency` Hz, identical on every channel.
pub fn tone(frequency: f32, seconds: f64, sample_rate: u32, channels: usize) -> Result<SampleBuffer, EngineError> {
    let frames = seconds_to_frame(seconds, sample_rate);
    let rate = sample_rate as f32;
    let samples: Vec<f32> = (0..frames)
        .map(|frame| (TAU * frequency * frame as f32 / rate).sin() * 0.5)
        .collect();
    SampleBuffer::new(vec![samples; channels.max(1)], sample_rate)
}

/// Mono buffer whose sample at frame `i` is `i / frames`. Useful for
/// checking where frames moved to after an edit.
pub fn ramp(frames: usize, sample_rate: u32) -> Result<SampleBuffer, EngineError> {
    let denominator = frames.max(1) as f32;
    let samples = (0..frames).map(|frame| frame as f32 / denominator).collect();
    SampleBuffer::from_mono(samples, sample_rate)
}

/// A stereo drum-ish loop: a decaying low thump on every beat and seeded
/// noise bursts on the off-beats. Same inputs always give the same samples.
pub fn demo_loop(bpm: f64, bars: u32, sample_rate: u32) -> Result<SampleBuffer, EngineError> {
    let grid = Grid::new(bpm, DEFAULT_DIVISION)?;
    let duration = grid.bar_duration() * f64::from(bars);
    let frames = seconds_to_frame(duration, sample_rate);
    let beat_frames = seconds_to_frame(grid.beat_duration(), sample_rate).max(1);
    let half_beat = (beat_frames / 2).max(1);
    let rate = sample_rate as f32;

    let mut rng = ChaCha8Rng::seed_from_u64(DEMO_SEED);
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in 0..frames {
        let in_beat = frame % beat_frames;
        let since_beat = in_beat as f32 / rate;
        let thump = (TAU * 55.0 * since_beat).sin() * (-since_beat * 18.0).exp() * 0.8;

        let hat = if in_beat >= half_beat {
            let since_hat = (in_beat - half_beat) as f32 / rate;
            rng.random_range(-1.0_f32..1.0) * (-since_hat * 60.0).exp() * 0.25
        } else {
            0.0
        };

        left.push((thump + hat).clamp(-1.0, 1.0));
        right.push((thump - hat * 0.5).clamp(-1.0, 1.0));
    }

    SampleBuffer::new(vec![left, right], sample_rate)
}

/// Engine preloaded with [`demo_loop`] at the demo tempo and a fixed seed.
pub fn demo_engine() -> Result<Engine, EngineError> {
    let buffer = demo_loop(DEMO_BPM, DEMO_BARS, DEFAULT_SAMPLE_RATE)?;
    Engine::with_seed(buffer, EngineConfig::default(), DEMO_SEED)
}

/// [`demo_engine`] with a "Kick" marker on every bar line and the bar
/// tracker placed.
pub fn demo_engine_with_markers() -> Result<Engine, EngineError> {
    let mut engine = demo_engine()?;
    for bar in 1..=u64::from(DEMO_BARS) {
        let time = engine.grid().bar_to_time(bar);
        engine.add_marker(time, Some(format!("Bar {bar}")), Some("Kick".to_string()))?;
    }
    engine.update_bar_tracker();
    Ok(engine)
}
