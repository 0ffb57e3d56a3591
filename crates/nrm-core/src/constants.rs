/// Golden ratio: (1 + √5) / 2
pub const PHI: f64 = 1.618_033_988_749_895;

/// Euler's number, the second transcendental phase axis.
pub const EULER: f64 = std::f64::consts::E;

/// Golden angle in radians: 2π / φ²
pub const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653_3;

/// Phase rotation applied (with opposite signs) to the two children of a
/// decomposed composite: half the golden angle.
pub const SPLIT_ANGLE: f64 = GOLDEN_ANGLE / 2.0;

/// Metric values are percent-scaled before entering phase space.
pub const PERCENT_SCALE: f64 = 100.0;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;
