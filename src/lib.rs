// ==================== Imports ====================
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

#[macro_use]
mod browser;
mod background;
mod engine;
mod game;
mod sprite;

use game::PixelRush;

// ==================== Main Functions ====================
/// Main entry for the Webassembly module
/// - installs the panic hook
/// - starts the game loop on the local executor
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    // spawns a new asynchronous task in local thread, for web assembly
    // environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        engine::GameLoop::start(PixelRush::new())
            .await
            .expect("Could not start game loop");
    });

    Ok(())
}
