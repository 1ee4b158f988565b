//! Scenario-based tests for pipeline-chain

mod helpers;

mod create_step;
mod fatal_faults;
mod short_circuit;
