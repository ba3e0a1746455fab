#![recursion_limit = "256"]

//! Feed-forward classification of single cells from tabular CSV
//! features: loading, normalization, training with Burn, evaluation
//! and model export.

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
