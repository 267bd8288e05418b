//! Diagnostics sink. Browser console on wasm, stderr elsewhere.

const PREFIX: &str = "Idle Tycoon";

#[cfg(target_arch = "wasm32")]
pub fn info(msg: &str) {
    web_sys::console::log_1(&format!("{PREFIX}: {msg}").into());
}

#[cfg(target_arch = "wasm32")]
pub fn warn(msg: &str) {
    web_sys::console::warn_1(&format!("{PREFIX}: {msg}").into());
}

#[cfg(target_arch = "wasm32")]
pub fn error(msg: &str) {
    web_sys::console::error_1(&format!("{PREFIX}: {msg}").into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn info(msg: &str) {
    eprintln!("[info] {PREFIX}: {msg}");
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(msg: &str) {
    eprintln!("[warn] {PREFIX}: {msg}");
}

#[cfg(not(target_arch = "wasm32"))]
pub fn error(msg: &str) {
    eprintln!("[error] {PREFIX}: {msg}");
}
