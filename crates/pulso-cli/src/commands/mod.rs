//! CLI subcommands.

pub mod info;
pub mod render;

use anyhow::Context;
use pulso_core::{PortKind, UnitGraph, UnitId};
use pulso_units::{Dac, Gain, Osc};

/// Shared patch shape for the demo commands: N oscillators summed into a
/// gain stage feeding a mono sink.
pub struct Patch {
    /// The graph, compiled and ready to process.
    pub graph: UnitGraph,
    /// The gain stage (message inlet 0 sets the level).
    pub gain: UnitId,
    /// The terminal sink whose outlet 0 the host reads back.
    pub dac: UnitId,
}

/// Builds and compiles the oscillator patch.
pub fn build_patch(
    freqs: &[f32],
    gain: f32,
    sample_rate: f32,
    block_size: usize,
) -> anyhow::Result<Patch> {
    anyhow::ensure!(!freqs.is_empty(), "at least one --freq is required");

    let mut graph = UnitGraph::new(sample_rate, block_size);
    let gain_unit = graph.add_unit(Box::new(Gain::new(gain)))?;
    let dac = graph.add_unit(Box::new(Dac::new(1)))?;
    for &f in freqs {
        let osc = graph.add_unit(Box::new(Osc::new(f)))?;
        graph
            .connect(osc, 0, gain_unit, 0, PortKind::Signal)
            .with_context(|| format!("wiring oscillator at {f} Hz"))?;
    }
    graph.connect(gain_unit, 0, dac, 0, PortKind::Signal)?;
    graph.mark_terminal(dac)?;
    graph.compile().context("compiling the patch")?;

    Ok(Patch {
        graph,
        gain: gain_unit,
        dac,
    })
}
