//! Property-based tests for the reference units.
//!
//! Randomized frequencies, levels, and message timings; the units must
//! stay numerically sane (bounded, finite, in-range phase) under all of
//! them.

use proptest::prelude::*;
use pulso_core::{Message, PortKind, UnitGraph};
use pulso_units::{Gain, Osc, Phasor, Sig};

const BLOCK: usize = 64;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// The ramp stays in [0, 1) for any frequency, positive or negative.
    #[test]
    fn phasor_output_stays_in_unit_range(
        frequency in -20000.0f32..20000.0,
        blocks in 1usize..8,
    ) {
        let mut graph = UnitGraph::new(48000.0, BLOCK);
        let phasor = graph.add_unit(Box::new(Phasor::new(frequency))).unwrap();
        graph.mark_terminal(phasor).unwrap();
        graph.compile().unwrap();

        for _ in 0..blocks {
            graph.process_block();
            for &s in graph.terminal_output(phasor, 0).unwrap() {
                prop_assert!((0.0..1.0).contains(&s), "ramp out of range: {s}");
            }
        }
    }

    /// The oscillator stays bounded and finite under arbitrary frequency
    /// messages at arbitrary in-block times.
    #[test]
    fn osc_survives_random_frequency_messages(
        initial in 0.0f32..20000.0,
        updates in proptest::collection::vec((0.0f32..20000.0, 0.0f32..64.0), 0..8),
    ) {
        let mut graph = UnitGraph::new(48000.0, BLOCK);
        let osc = graph.add_unit(Box::new(Osc::new(initial))).unwrap();
        graph.mark_terminal(osc).unwrap();
        graph.compile().unwrap();

        for &(frequency, time) in &updates {
            graph.send_message(osc, 0, Message::Float(frequency), time).unwrap();
            graph.process_block();
            for &s in graph.terminal_output(osc, 0).unwrap() {
                prop_assert!(s.is_finite());
                prop_assert!(s.abs() <= 1.0 + 1e-6, "cosine out of range: {s}");
            }
        }
    }

    /// Gain times Sig is exact: every sample equals level * factor, with
    /// the change point at the message's ceiling sample.
    #[test]
    fn gain_steps_exactly_at_message_boundary(
        level in -2.0f32..2.0,
        factor in -2.0f32..2.0,
        time in 0.0f32..64.0,
    ) {
        let mut graph = UnitGraph::new(48000.0, BLOCK);
        let src = graph.add_unit(Box::new(Sig::new(level))).unwrap();
        let gain = graph.add_unit(Box::new(Gain::new(1.0))).unwrap();
        graph.connect(src, 0, gain, 0, PortKind::Signal).unwrap();
        graph.mark_terminal(gain).unwrap();
        graph.compile().unwrap();

        graph.send_message(gain, 0, Message::Float(factor), time).unwrap();
        graph.process_block();

        let boundary = (time.ceil() as usize).min(BLOCK);
        let out = graph.terminal_output(gain, 0).unwrap();
        for (i, &s) in out.iter().enumerate() {
            let expected = if i < boundary { level } else { level * factor };
            prop_assert!(
                (s - expected).abs() < 1e-6,
                "sample {i}: got {s}, expected {expected} (boundary {boundary})"
            );
        }
    }
}
