//! Densified line paths evaluated against a slope field

mod cross_slope;
mod densify;

pub use cross_slope::{
    attach_evaluations, bearing, decompose, evaluate_path, evaluate_paths, PathEvalParams, PathEvaluation,
    RunningSlopeMode,
};
pub use densify::{densify, validate_interval};
