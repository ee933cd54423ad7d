//! End-to-end tests for kubequery live under `tests/`; this crate has no library code.
