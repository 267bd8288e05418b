use std::{cell::RefCell, io, rc::Rc};

use idle_tycoon::economy::catalog::Catalog;
use idle_tycoon::economy::render::render;
use idle_tycoon::economy::save::Storage;
use idle_tycoon::economy::state::Track;
use idle_tycoon::economy::{Engine, EngineConfig};
use idle_tycoon::time::SystemClock;
use ratzilla::event::KeyCode;
use ratzilla::ratatui::Terminal;
use ratzilla::{DomBackend, WebRenderer};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

#[cfg(target_arch = "wasm32")]
fn storage() -> Box<dyn Storage> {
    Box::new(idle_tycoon::economy::save::LocalStorage)
}

#[cfg(not(target_arch = "wasm32"))]
fn storage() -> Box<dyn Storage> {
    Box::new(idle_tycoon::economy::save::MemoryStorage::new())
}

/// Write the save synchronously when the page goes away.
fn install_flush_hooks(engine: &Rc<RefCell<Engine>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let engine = engine.clone();
    let flush = Closure::wrap(Box::new(move || {
        if let Err(e) = engine.borrow_mut().flush() {
            web_sys::console::warn_1(&format!("Idle Tycoon: flush failed: {e}").into());
        }
    }) as Box<dyn FnMut()>);
    for event in ["pagehide", "beforeunload"] {
        if window
            .add_event_listener_with_callback(event, flush.as_ref().unchecked_ref())
            .is_err()
        {
            web_sys::console::warn_1(&format!("Idle Tycoon: cannot listen for {event}").into());
        }
    }
    // Lives as long as the page.
    flush.forget();
}

fn handle_key(engine: &mut Engine, key: char) {
    // Rejections (not enough money, boost busy...) are silently ignored.
    match key {
        'c' => {
            engine.tap();
        }
        'u' => {
            let _ = engine.upgrade();
        }
        'e' => {
            let _ = engine.start_ad(Track::Earnings);
        }
        'b' => {
            let _ = engine.start_ad(Track::Business);
        }
        'i' => {
            let active = engine.is_investing_view_active();
            engine.set_investing_view_active(!active);
        }
        'o' => engine.clear_offline_earnings(),
        '1'..='9' => {
            let idx = (key as u8 - b'1') as usize;
            let target = engine.catalog().businesses.get(idx).and_then(|def| {
                def.sizes
                    .first()
                    .map(|size| (def.id.clone(), size.size_type.clone()))
            });
            if let Some((business_id, size_type)) = target {
                let _ = engine.buy_business(&business_id, &size_type, "");
            }
        }
        _ => {}
    }
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();

    let engine = Rc::new(RefCell::new(Engine::new(
        Catalog::starter(),
        EngineConfig::default(),
        storage(),
        Box::new(SystemClock),
    )));
    install_flush_hooks(&engine);

    let backend = DomBackend::new()?;
    let mut terminal = Terminal::new(backend)?;

    terminal.on_key_event({
        let engine = engine.clone();
        move |key_event| {
            if let KeyCode::Char(c) = key_event.code {
                handle_key(&mut engine.borrow_mut(), c.to_ascii_lowercase());
            }
        }
    });

    terminal.draw_web(move |f| {
        let mut engine = engine.borrow_mut();
        engine.pump();
        render(&engine, f, f.area());
    });

    Ok(())
}
