//! `magplane-runtime` – pipeline orchestration.
//!
//! # Modules
//!
//! - [`session`] – [`Session`][session::Session]: the synchronous owner of
//!   every piece of pipeline state.  Sensor samples go in through
//!   [`on_sample`][session::Session::on_sample]; frames come out of
//!   [`tick`][session::Session::tick].
//! - [`runner`] – [`Runner`][runner::Runner]: async driver that wires a
//!   [`SampleSource`][magplane_middleware::SampleSource], a
//!   [`FrameClock`][magplane_middleware::FrameClock] and the output sinks to
//!   a session until its [`RunHandle`][runner::RunHandle] is stopped.
//! - [`sink`] – output traits for frames and text readouts.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.

pub mod runner;
pub mod session;
pub mod sink;
pub mod telemetry;

pub use runner::{RunHandle, Runner};
pub use session::{Session, SessionConfig};
pub use sink::{FrameSink, NullSink, TextSink};
pub use telemetry::{TracerProviderGuard, init_tracing};
