//! End-to-end scenario S1: the renderer opens `/`,
//! the application emits one scene that clears the window to a flat color,
//! and `:width`/`:height` come back as `640`/`480`.

use boldui::app::{setup_logging, BoldUiApplication, RunnerConfig};
use boldui::protocol::{Color, SceneAttr};

fn main() -> std::io::Result<()> {
    setup_logging();

    let mut app: BoldUiApplication<()> = BoldUiApplication::new(RunnerConfig::default());
    app.view_handler(
        "",
        Box::new(|scene, _state| {
            let paint = scene.const_color(Color::from_hex(0x24_24_24));
            scene.cmd_clear(paint);

            let title = scene.const_str("Hello");
            let width = scene.const_int(640);
            let height = scene.const_int(480);
            let size = scene.point(width, height);
            scene.set_attr(SceneAttr::WindowTitle, title);
            scene.set_attr(SceneAttr::Size, size);
        }),
        Box::new(|| ()),
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    app.main_loop(stdin.lock(), stdout.lock())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}
