//! End-to-end scenario S3: a scene variable
//! `start_time: Double` and a `Watch` on `GetTime > start_time + 1.0` with
//! `wait_for_roundtrip=true`. Each time the watch fires it replies `/tick`
//! instead of drawing a fresh scene directly; the application advances its
//! model, ack's the watch, and rebuilds — moving a rectangle one step per
//! second without the renderer ever polling.

use boldui::app::{setup_logging, BoldUiApplication, RunnerConfig};
use boldui::protocol::{Color, HandlerBlock, HandlerCmd, SceneAttr, SceneId, Value, WatchAck};

#[derive(Debug, Clone, Copy)]
struct AnimState {
    start_time: f64,
    frame: i64,
}

impl Default for AnimState {
    fn default() -> Self {
        AnimState { start_time: 0.0, frame: 0 }
    }
}

const STEP_PX: i64 = 20;
const TRACK_WIDTH: i64 = 560;

fn main() -> std::io::Result<()> {
    setup_logging();

    let mut app: BoldUiApplication<AnimState> = BoldUiApplication::new(RunnerConfig::default());

    app.view_handler(
        "",
        Box::new(|scene, state: &mut AnimState| {
            let bg = scene.const_color(Color::from_hex(0x18_18_18));
            scene.cmd_clear(bg);

            let x = 40 + (state.frame * STEP_PX) % TRACK_WIDTH;
            let left = scene.const_int(x);
            let top = scene.const_int(220);
            let right = scene.const_int(x + 40);
            let bottom = scene.const_int(260);
            let rect = scene.rect(left, top, right, bottom);
            let paint = scene.const_color(Color::from_hex(0xe0_a0_30));
            scene.cmd_draw_rect(paint, rect);

            let start_time_var = scene.declare_var("start_time", Value::Double(state.start_time));
            let start_time = scene.var(start_time_var);
            let one_second = scene.value(Value::Double(1.0));
            let threshold = scene.add(start_time, one_second);
            let now = scene.get_time();
            let condition = scene.greater_than(now, threshold);

            let scene_id_op = scene.const_int(scene.id().0 as i64);
            let watch_index_op = scene.const_int(scene.next_watch_index() as i64);
            let handler = HandlerBlock::new(
                vec![],
                vec![HandlerCmd::Reply { path: "/tick".into(), params: vec![scene_id_op, watch_index_op] }],
            );
            scene.on_watch(condition, handler, true, false);

            let title = scene.const_str("Watched animation");
            let width = scene.const_int(640);
            let height = scene.const_int(480);
            let size = scene.point(width, height);
            scene.set_attr(SceneAttr::WindowTitle, title);
            scene.set_attr(SceneAttr::Size, size);
        }),
        Box::new(AnimState::default),
    );

    app.reply_handler(
        "/tick",
        Box::new(|state: &mut AnimState, params| {
            let ack = match (params.first(), params.get(1)) {
                (Some(Value::Sint64(scene)), Some(Value::Sint64(watch_index))) => {
                    Some(WatchAck { scene: SceneId(*scene as u32), watch_index: *watch_index as u32 })
                }
                _ => None,
            };
            state.frame += 1;
            state.start_time += 1.0;
            ack
        }),
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    app.main_loop(stdin.lock(), stdout.lock())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}
