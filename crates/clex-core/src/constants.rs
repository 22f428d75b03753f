//! Numerical constants shared across the engine.

/// Tolerance for accepting an eigenvalue of the averaged stabilizer rotation as 1.
pub const INVARIANT_EIGENVALUE_TOLERANCE: f64 = 1e-5;

/// Tolerance below which a Cartesian component is treated as zero.
pub const CARTESIAN_ZERO_TOLERANCE: f64 = 1e-10;
