//! Reference units for the pulso signal runtime.
//!
//! A compact set of processing units implementing the
//! [`Unit`](pulso_core::Unit) contract, covering each capability the core
//! schedules around:
//!
//! - [`Sig`] — constant signal source, level set by message
//! - [`Phasor`] — 0..1 ramp oscillator, frequency by message or signal
//! - [`Osc`] — cosine oscillator, same inlet discipline as [`Phasor`]
//! - [`Gain`] — signal scaler with message-settable factor
//! - [`Add`] — two-signal adder, or signal + message-set scalar
//! - [`Dac`] — N-channel terminal sink whose outlets the host reads back
//! - [`Sqrt`] — message-only relay (square root of incoming floats),
//!   participating in schedule ordering but not in buffer wiring
//!
//! Oscillators switch between a scalar fast path and a signal-rate path
//! depending on whether their frequency inlet is connected, driven by the
//! core's connection-change hook rather than by per-block inspection.

mod add;
mod dac;
mod gain;
mod osc;
mod phasor;
mod sig;
mod sqrt;

pub use add::Add;
pub use dac::Dac;
pub use gain::Gain;
pub use osc::Osc;
pub use phasor::Phasor;
pub use sig::Sig;
pub use sqrt::Sqrt;
