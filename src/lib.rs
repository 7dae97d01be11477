// src/lib.rs
//! Capture a still frame, ask a multimodal model about it, show the answer.

pub mod ai;
pub mod capture;
pub mod config;
pub mod controller;
pub mod encode;
pub mod gui;
