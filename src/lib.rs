#![recursion_limit = "256"]

pub mod error;

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
