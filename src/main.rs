mod idle;
mod input;
mod logging;
mod time;
mod widgets;

use std::{cell::RefCell, io, rc::Rc};

use idle::config::GameConfig;
use idle::save::SaveStore;
use idle::session::GameSession;
use idle::IdleGame;
use input::{ClickState, InputEvent};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use ratzilla::event::{KeyCode, MouseButton, MouseEventKind};
use ratzilla::ratatui::Terminal;
use ratzilla::{DomBackend, WebRenderer};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// Milliseconds from `performance.now()`, falling back to the wall clock.
fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Map a mouse position to a click action using the grid container's
/// bounding rect.
fn dom_hit_test(mouse_x: u32, mouse_y: u32, cs: &ClickState) -> Option<u16> {
    let document = web_sys::window()?.document()?;
    // DomBackend renders the grid as a <div> directly inside <body>.
    let grid = document.query_selector("body > div").ok()??;
    let rect = grid.get_bounding_client_rect();

    let action = cs.hit_test_pixels(
        mouse_x as f64 - rect.left(),
        mouse_y as f64 - rect.top(),
        rect.width(),
        rect.height(),
    );
    log::debug!("click at ({mouse_x}, {mouse_y}) -> {action:?}");
    action
}

/// Flush the session when the page is hidden or unloaded, and restart it
/// when the page is restored from the back/forward cache.
fn watch_page_lifecycle(game: &Rc<RefCell<IdleGame>>) {
    let Some(window) = web_sys::window() else {
        return;
    };

    let on_hide = Closure::<dyn FnMut(web_sys::Event)>::new({
        let game = game.clone();
        move |_: web_sys::Event| game.borrow_mut().suspend()
    });
    let on_show = Closure::<dyn FnMut(web_sys::PageTransitionEvent)>::new({
        let game = game.clone();
        move |event: web_sys::PageTransitionEvent| {
            if event.persisted() {
                game.borrow_mut().resume();
            }
        }
    });

    let listeners: [(&str, &js_sys::Function); 2] = [
        ("pagehide", on_hide.as_ref().unchecked_ref()),
        ("pageshow", on_show.as_ref().unchecked_ref()),
    ];
    for (name, callback) in listeners {
        if let Err(e) = window.add_event_listener_with_callback(name, callback) {
            log::warn!("could not listen for {name}: {e:?}");
        }
    }
    // Listeners live as long as the page.
    on_hide.forget();
    on_show.forget();
}

#[cfg(target_arch = "wasm32")]
fn open_store() -> Box<dyn SaveStore> {
    match idle::save::LocalStorage::open() {
        Some(storage) => Box::new(storage),
        None => {
            log::warn!("localStorage unavailable, progress will not persist");
            Box::new(idle::save::MemoryStore::new())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_store() -> Box<dyn SaveStore> {
    Box::new(idle::save::MemoryStore::new())
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();

    let config = GameConfig::default();
    logging::init(config.log_level);

    let rng = SmallRng::seed_from_u64(js_sys::Date::now().to_bits());
    let session = GameSession::new(config, open_store(), rng);
    let game = Rc::new(RefCell::new(IdleGame::new(session)));
    let click_state = Rc::new(RefCell::new(ClickState::new()));
    watch_page_lifecycle(&game);

    let backend = DomBackend::new()?;
    let terminal = Terminal::new(backend)?;

    terminal.on_mouse_event({
        let game = game.clone();
        let click_state = click_state.clone();
        move |mouse_event| {
            if mouse_event.event != MouseEventKind::Pressed
                || mouse_event.button != MouseButton::Left
            {
                return;
            }
            let action = {
                let cs = click_state.borrow();
                if cs.terminal_rows == 0 || cs.terminal_cols == 0 {
                    return;
                }
                dom_hit_test(mouse_event.x, mouse_event.y, &cs)
            };
            if let Some(action) = action {
                game.borrow_mut().handle_input(&InputEvent::Click(action));
            }
        }
    });

    terminal.on_key_event({
        let game = game.clone();
        move |key_event| {
            if let KeyCode::Char(c) = key_event.code {
                game.borrow_mut().handle_input(&InputEvent::Key(c));
            }
        }
    });

    terminal.draw_web(move |f| {
        let mut game = game.borrow_mut();
        game.frame(now_ms());

        let area = f.area();
        click_state.borrow_mut().begin_frame(area.width, area.height);
        game.render(f, area, &click_state);
    });

    Ok(())
}
