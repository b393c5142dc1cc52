// src/star/mod.rs

pub mod fact;
pub mod sector;
pub mod time;
