// src/handlers/mod.rs

pub mod exams;
pub mod grades;
pub mod monitoring;
