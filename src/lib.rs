//! Submission tracking and hostel occupancy recognition for the student
//! campus portal.

pub mod analysis;
pub mod config;
pub mod import;
pub mod models;
pub mod random;
pub mod recognition;
pub mod report;
pub mod submissions;
