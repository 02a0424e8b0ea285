// Test modules for interview-resilience
//
// Each source module has a corresponding test file that focuses on
// behavior verification rather than implementation details.

// Shared fixtures: mock reporting sink, hook recorder, handler builders
pub mod helpers;

pub mod classifier;
pub mod handler;
pub mod reporting;
