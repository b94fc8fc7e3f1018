//! Engine scenario benchmarks.
//!
//! These model the per-block work of a running sequencer: look-ahead ticks
//! over a busy song, and audio pushed through an effect graph.

mod graph;
mod scheduler;

pub use graph::bench_graph;
pub use scheduler::bench_scheduler;
