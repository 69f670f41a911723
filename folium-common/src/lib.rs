//! An internal crate containing utility functions and structs reused across the
//! different crates of the folium project.
//!
//! This crate is not meant for external consumption.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bit;
pub mod pitch;
pub mod raster;
