//! End-to-end scenario S2: a model `{count: Sint64 = 0}`
//! bound as a scene variable, a centered label reading it back through
//! `ToString(Var(...))`, and a clickable rectangle whose `MouseDown` handler
//! replies to `/inc`. After three clicks the displayed text is `"3"`.

use boldui::app::{setup_logging, BoldUiApplication, RunnerConfig};
use boldui::protocol::{Color, EventType, HandlerBlock, HandlerCmd, SceneAttr, Value};

#[derive(Debug, Clone, Copy, Default)]
struct CounterState {
    count: i64,
}

fn main() -> std::io::Result<()> {
    setup_logging();

    let mut app: BoldUiApplication<CounterState> = BoldUiApplication::new(RunnerConfig::default());

    app.view_handler(
        "",
        Box::new(|scene, state: &mut CounterState| {
            let bg = scene.const_color(Color::from_hex(0x20_20_20));
            scene.cmd_clear(bg);

            let count_var = scene.declare_var("count", Value::Sint64(state.count));
            let count_read = scene.var(count_var);
            let text = scene.to_string_op(count_read);
            let text_paint = scene.const_color(Color::from_hex(0xff_ff_ff));
            let cx = scene.const_int(320);
            let cy = scene.const_int(240);
            let center = scene.point(cx, cy);
            scene.cmd_draw_centered_text(text, text_paint, center);

            let rect_left = scene.const_int(270);
            let rect_top = scene.const_int(190);
            let rect_right = scene.const_int(370);
            let rect_bottom = scene.const_int(290);
            let rect = scene.rect(rect_left, rect_top, rect_right, rect_bottom);
            let rect_paint = scene.const_color(Color::from_hex(0x60_60_a0));
            scene.cmd_draw_rect(rect_paint, rect);

            let continue_handling = scene.const_int(1);
            scene.on_event(
                EventType::MouseDown(rect),
                HandlerBlock::new(vec![], vec![HandlerCmd::Reply { path: "/inc".into(), params: vec![] }]),
                continue_handling,
            );

            let title = scene.const_str("Counter");
            let width = scene.const_int(640);
            let height = scene.const_int(480);
            let size = scene.point(width, height);
            scene.set_attr(SceneAttr::WindowTitle, title);
            scene.set_attr(SceneAttr::Size, size);
        }),
        Box::new(CounterState::default),
    );

    app.reply_handler(
        "/inc",
        Box::new(|state: &mut CounterState, _params| {
            state.count += 1;
            None
        }),
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    app.main_loop(stdin.lock(), stdout.lock())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}
