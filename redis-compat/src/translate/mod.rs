//! The two pure translation layers between the caller and driver dialects
//!
//! [`params`] coerces heterogeneous caller inputs into the exact argument
//! sequences each command family expects; [`results`] reshapes the driver's
//! structured results back into the flat string/array encoding callers
//! expect. Both are pure: no I/O, no state, deterministic output.

pub mod params;
pub mod results;
