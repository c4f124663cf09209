//! Scripted destruction scenes with timing reports and JSON baselines.

pub mod report;
pub mod runner;
pub mod scenes;
