//! The Girder CLI client library.
//!
//! This crate provides the command-line front end for a Girder data
//! management server: global connection and authentication options, plus the
//! `upload`, `download` and `localsync` commands.
//!
//! # Modules
//!
//! - `client`: The Girder client trait and its REST implementation
//! - `commands`: Command registration, argument parsing and dispatch
//! - `configuration`: Configuration file management
//! - `error`: Command-level errors and their exit codes
//! - `exit_codes`: Process exit codes
//! - `model`: Connection parameters, credentials and Girder documents

pub mod client;
pub mod commands;
pub mod configuration;
pub mod error;
pub mod exit_codes;
pub mod model;
