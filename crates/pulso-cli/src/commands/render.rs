//! Offline block-loop rendering to WAV.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use pulso_core::Message;

use super::build_patch;

/// Arguments for `pulso render`.
#[derive(Args)]
pub struct RenderArgs {
    /// Oscillator frequency in Hz (repeat for a chord)
    #[arg(long = "freq", default_values_t = vec![440.0])]
    pub freqs: Vec<f32>,

    /// Linear output gain
    #[arg(long, default_value_t = 0.5)]
    pub gain: f32,

    /// Render length in seconds
    #[arg(long, default_value_t = 2.0)]
    pub seconds: f32,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 48000)]
    pub sample_rate: u32,

    /// Samples per block
    #[arg(long, default_value_t = 64)]
    pub block_size: usize,

    /// Fade the gain to zero over the final second
    #[arg(long)]
    pub fade_out: bool,

    /// Output WAV path
    #[arg(short, long, default_value = "out.wav")]
    pub output: PathBuf,
}

/// Renders the patch block by block and writes a 16-bit mono WAV.
pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.seconds > 0.0, "--seconds must be positive");
    anyhow::ensure!(args.block_size > 0, "--block-size must be positive");

    let sample_rate = args.sample_rate as f32;
    let mut patch = build_patch(&args.freqs, args.gain, sample_rate, args.block_size)?;

    let total_blocks = (args.seconds * sample_rate / args.block_size as f32).ceil() as u64;
    let fade_blocks = if args.fade_out {
        (sample_rate / args.block_size as f32).ceil() as u64
    } else {
        0
    };

    tracing::info!(
        "rendering {} blocks of {} samples at {} Hz",
        total_blocks,
        args.block_size,
        args.sample_rate
    );

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: args.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let bar = ProgressBar::new(total_blocks);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} blocks ({eta})")
            .expect("static template"),
    );

    for block in 0..total_blocks {
        // Step the fade at block boundaries; the executor places each
        // change on the block's first sample.
        if fade_blocks > 0 && block + fade_blocks >= total_blocks {
            let remaining = (total_blocks - block) as f32 / fade_blocks as f32;
            let _ = patch
                .graph
                .send_message(patch.gain, 0, Message::Float(args.gain * remaining), 0.0);
        }

        patch.graph.process_block();
        let samples = patch
            .graph
            .terminal_output(patch.dac, 0)
            .context("reading the sink output")?;
        for &s in samples {
            let clamped = s.clamp(-1.0, 1.0);
            writer.write_sample((clamped * f32::from(i16::MAX)) as i16)?;
        }
        bar.inc(1);
    }

    bar.finish();
    writer.finalize().context("finalizing WAV")?;
    tracing::info!("wrote {}", args.output.display());
    println!("wrote {}", args.output.display());
    Ok(())
}
