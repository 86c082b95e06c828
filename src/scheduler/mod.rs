//! Greedy scheduling and execution KPIs.
//!
//! Provides a single-pass, priority-driven equipment dispatcher and the
//! performance indicators computed over executed tasks.
//!
//! # Algorithm
//!
//! `GreedyScheduler` orders pending tasks by priority and deadline and gives
//! each the nearest idle, capable equipment. It is not optimal, but it is
//! fast and fully deterministic.
//!
//! # KPI
//!
//! `PerformanceMetrics` computes completion counts, success rate, average
//! execution time and per-type breakdowns.

mod greedy;
mod kpi;

pub use greedy::{Dispatch, GreedyScheduler};
pub use kpi::{PerformanceMetrics, TaskTypeStats};
