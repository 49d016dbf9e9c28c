// src/view/mod.rs
//! Terminal views for the field console

pub mod console;

pub use console::ConsoleView;
