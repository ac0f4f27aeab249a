pub mod encryption;
pub mod format;
pub mod memory;
pub mod traits;
#[cfg(not(target_arch = "wasm32"))]
pub mod vault;
