use tauri::menu::{AboutMetadata, Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu};
use tauri::{AppHandle, Wry};

use crate::{reachability, ui_shell, updater, APP_NAME};

const MENU_CHECK_UPDATES: &str = "check_for_updates";
const MENU_SETTINGS: &str = "open_settings";
const MENU_QUIT: &str = "quit";

pub(crate) fn build_app_menu(app: &AppHandle) -> tauri::Result<Menu<Wry>> {
    let about_label = format!("About {APP_NAME}");
    let about =
        PredefinedMenuItem::about(app, Some(about_label.as_str()), Some(AboutMetadata::default()))?;
    let check_updates = MenuItem::with_id(
        app,
        MENU_CHECK_UPDATES,
        "Check for Updates…",
        true,
        None::<&str>,
    )?;
    let settings = MenuItem::with_id(app, MENU_SETTINGS, "Settings…", true, Some("CmdOrCtrl+,"))?;
    let hide_label = format!("Hide {APP_NAME}");
    let hide = PredefinedMenuItem::hide(app, Some(hide_label.as_str()))?;
    // A plain item rather than the predefined quit so the exit carries a code
    // and passes the exit filter in `main`.
    let quit = MenuItem::with_id(
        app,
        MENU_QUIT,
        format!("Quit {APP_NAME}"),
        true,
        Some("CmdOrCtrl+Q"),
    )?;

    let app_menu = Submenu::with_items(
        app,
        APP_NAME,
        true,
        &[
            &about,
            &PredefinedMenuItem::separator(app)?,
            &check_updates,
            &settings,
            &PredefinedMenuItem::separator(app)?,
            &hide,
            &PredefinedMenuItem::separator(app)?,
            &quit,
        ],
    )?;

    let edit_menu = Submenu::with_items(
        app,
        "Edit",
        true,
        &[
            &PredefinedMenuItem::undo(app, None)?,
            &PredefinedMenuItem::redo(app, None)?,
            &PredefinedMenuItem::separator(app)?,
            &PredefinedMenuItem::cut(app, None)?,
            &PredefinedMenuItem::copy(app, None)?,
            &PredefinedMenuItem::paste(app, None)?,
            &PredefinedMenuItem::select_all(app, None)?,
        ],
    )?;

    let window_menu = Submenu::with_items(
        app,
        "Window",
        true,
        &[
            &PredefinedMenuItem::minimize(app, None)?,
            &PredefinedMenuItem::close_window(app, None)?,
        ],
    )?;

    Menu::with_items(app, &[&app_menu, &edit_menu, &window_menu])
}

pub(crate) fn handle_menu_event(app: &AppHandle, event: MenuEvent) {
    match event.id().as_ref() {
        MENU_CHECK_UPDATES => updater::spawn_manual_check(app),
        MENU_SETTINGS => {
            if let Err(error) = ui_shell::open_settings_window(app) {
                tracing::warn!("{error}");
            }
        }
        MENU_QUIT => {
            tracing::info!("quit requested");
            reachability::stop_monitor(app);
            app.exit(0);
        }
        _ => {}
    }
}
