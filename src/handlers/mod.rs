// src/handlers/mod.rs

pub mod offline;
pub mod round;
