#![doc = "coverage-sync-core: core logic library for coverage-sync."]

//! This crate holds the data models and the pipeline that turns flat per-file
//! coverage rows into per-commit, per-language coverage reports.
//! Database access and HTTP publishing live behind the traits in [`contract`];
//! concrete implementations are provided by the `coverage-sync` CLI crate.
//!
//! # Usage
//! Build a [`config::SynchroniseConfig`], hand a [`contract::RecordSource`] and a
//! [`contract::CoveragePublisher`] to [`synchronise::synchronise`], and inspect
//! the returned [`synchronise::SynchroniseReport`].

pub mod aggregate;
pub mod config;
pub mod contract;
pub mod decode;
pub mod error;
pub mod report;
pub mod resolve;
pub mod synchronise;
