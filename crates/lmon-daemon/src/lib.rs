//! lmon-daemon: the HTTP surface for the settlement exposure monitor.
//!
//! Everything correctness-relevant lives in `lmon-core`/`lmon-db`; this
//! crate only does JSON framing, routing, and process wiring.

pub mod api_types;
pub mod routes;
pub mod state;
