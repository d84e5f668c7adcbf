// src/models/mod.rs

pub mod attempt;
pub mod exam;
pub mod student;
pub mod violation;
