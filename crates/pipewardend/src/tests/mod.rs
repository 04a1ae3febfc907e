//! Test suites for the pipeline daemon.

pub(crate) mod support;
