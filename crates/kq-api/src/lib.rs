//! kubequery API: library crate for the natural-language cluster query server.
//!
//! Re-exports all modules so the binary (`main.rs`) and external crates
//! (e.g. `kq-e2e-tests`) can access internal types like `AppState`,
//! `build_router`, and `Classifier`.

pub mod config;
pub mod error;
pub mod inference;
pub mod orchestrator;
pub mod registry;
pub mod routes;
pub mod state;
pub mod telemetry;
