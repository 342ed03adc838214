//! Scenario-based tests for stepline

mod helpers;

mod executor_policy;
mod randomized_load;
mod round_trip;
