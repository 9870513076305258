// src/handlers/mod.rs

pub mod admin;
pub mod attempt;
pub mod auth;
pub mod docs;
pub mod quiz;
pub mod session;
