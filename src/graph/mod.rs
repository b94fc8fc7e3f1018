//! The effect graph: declarative model, live units, routing and modulation.
//!
//! An [`FxGraph`] snapshot is the only routing state the engine reads. The
//! [`SignalGraph`] realizes it into live processing units, and the
//! modulation loop drives unit parameters from control nodes and note color
//! every animation frame.

/// Signal graph builder and block renderer.
pub mod builder;
/// Declarative nodes, connections and colors.
pub mod model;
/// Per-frame parameter modulation.
pub mod modulation;
/// Parameter schema per node type.
pub mod params;
/// Pure modulation-source evaluation.
pub mod resolve;
/// Live processing units (effect node factory).
pub mod unit;

pub use builder::{GraphStats, SignalGraph, UpdateOutcome};
pub use model::{
    ColorChannel, ColorSample, Connection, FxGraph, FxNode, NodeKind, SourceOutput, OUTPUT_ID,
    SOURCE_ID,
};
pub use modulation::{run_modulation, ParamTarget};
pub use resolve::resolve;
