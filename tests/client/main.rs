//! End-to-end tests: the client driven against the in-memory backend.

mod caches;
mod commands;
mod session;
mod support;
