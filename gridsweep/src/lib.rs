//! GridSweep - energization sweep for radial distribution networks
//!
//! This library walks every circuit of a distribution network from its
//! breaker, assigns each reached switching element, line segment and
//! transformer its protecting switch and upstream path, and then looks behind
//! every open tie switch for the ring it would close.
//!
//! # Quick Start
//!
//! ```no_run
//! use gridsweep::{GridSweepCore, LoaderOptions, SweepOptions};
//! use std::path::Path;
//!
//! let (_dataset, result) = GridSweepCore::sweep_directory(
//!     Path::new("network/"),
//!     &LoaderOptions::default(),
//!     &SweepOptions::default(),
//! ).unwrap();
//!
//! for row in &result.switching_elements {
//!     println!("{} <- {:?}", row.element.operational_code, row.parent_operational_code);
//! }
//! ```
//!
//! # Features
//!
//! - **Energization sweep**: Protection hierarchy per circuit, foreign switches held open
//! - **Ring search**: Internal rings and external ties behind open switches
//! - **Loader**: Delimited utility exports with header aliases
//! - **Reports**: CSV tables, JSON, summary tables and DOT hierarchies

pub mod core;
pub mod loader;
pub mod network;
pub mod report;
pub mod results;
pub mod sweep;

// Re-export main types
pub use core::{GridSweepCore, GridSweepError, SweepOptions};
pub use loader::{load_dataset, LoaderOptions};
pub use network::{
    Circuit, LineSegment, NetworkDataset, NetworkTopology, SwitchState, SwitchingElement,
    Transformer,
};
pub use results::{
    CircuitSummary, LineResult, RingClosure, RingKind, SweepResult, SwitchingElementResult,
    TransformerResult,
};

/// Sweep an in-memory dataset with default options (convenience wrapper).
pub fn sweep(dataset: &NetworkDataset) -> SweepResult {
    GridSweepCore::run(dataset, &SweepOptions::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        GridSweepCore, GridSweepError, LineSegment, LoaderOptions, NetworkDataset, RingKind,
        SweepOptions, SweepResult, SwitchState, SwitchingElement, Transformer,
    };
}
