//! Schedule introspection.

use clap::Args;

use super::build_patch;

/// Arguments for `pulso info`.
#[derive(Args)]
pub struct InfoArgs {
    /// Oscillator frequency in Hz (repeat for a chord)
    #[arg(long = "freq", default_values_t = vec![440.0])]
    pub freqs: Vec<f32>,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 48000)]
    pub sample_rate: u32,

    /// Samples per block
    #[arg(long, default_value_t = 64)]
    pub block_size: usize,
}

/// Compiles the patch and prints the schedule.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let patch = build_patch(&args.freqs, 1.0, args.sample_rate as f32, args.block_size)?;
    let schedule = patch
        .graph
        .compiled()
        .expect("build_patch compiles the graph");

    println!(
        "{} units, {} edges, block size {}",
        patch.graph.unit_count(),
        patch.graph.edge_count(),
        patch.graph.block_size()
    );
    println!(
        "{} steps ({} implicit adds), {} buffer slots",
        schedule.step_count(),
        schedule.implicit_add_count(),
        schedule.buffer_count()
    );
    print!("{}", schedule.describe());
    Ok(())
}
