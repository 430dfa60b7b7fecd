// src/models/mod.rs

pub mod assessment;
pub mod attempt;
pub mod cohort;
pub mod statistics;
pub mod user;
