//! Logging shim, selects between `log` and `defmt` macros
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

#[cfg(not(feature = "defmt"))]
pub use ::log::{trace, debug, info, warn, error};

#[cfg(feature = "defmt")]
pub use defmt::{trace, debug, info, warn, error};
