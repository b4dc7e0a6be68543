//! Database-backed workflow tests. These exercise the real handlers against
//! a live PostgreSQL instance and are ignored unless DATABASE_URL points at
//! one (`cargo test -- --ignored`).

mod support;

mod cancellation_workflow_tests;
mod swap_workflow_tests;
