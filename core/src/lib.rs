//! Recipe carbon-footprint evaluation and lower-emission substitution engine.

pub mod aggregate;
pub mod eligibility;
pub mod emission;
pub mod equivalence;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod models;
pub mod projection;
pub mod reference;
pub mod service;
pub mod units;

pub use error::{EngineError, EngineResult};
pub use reference::ReferenceData;
pub use service::{FootprintService, ReportSink};
