//! Command-line front ends for tapesim: replay, sweep and shadow runs

pub mod common;
