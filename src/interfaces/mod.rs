//! Adapters between the engine and the outside world: CSV journals in, CSV reports out.

pub mod csv;
