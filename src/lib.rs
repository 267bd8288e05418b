//! Idle tycoon economy engine.
//!
//! The browser binary in `main.rs` is a thin driver around [`economy::Engine`].

mod console;
pub mod economy;
pub mod time;
