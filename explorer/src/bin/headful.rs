use engine::FrameTick;
use engine::app::{self, AppConfig, InputFrame, LoopAction, SceneApp};
use engine::canvas::{self, Canvas};
use engine::surface::SurfaceSize;
use winit::dpi::PhysicalSize;
use winit::event::VirtualKeyCode;

use explorer::input::{DeviceClass, KeySet};
use explorer::logging;
use explorer::minimap::Minimap;
use explorer::orientation::SensorPlatform;
use explorer::registry::Registry;
use explorer::scene::{Explorer, ExplorerLogic, FrameOutput};
use explorer::settings::SettingsStore;
use explorer::triggers::PopupState;

const BUFFER: SurfaceSize = SurfaceSize::new(360, 360);
const BANNER_HEIGHT: u32 = 24;

struct HeadfulExplorer {
    explorer: Explorer,
    minimap: Minimap,
    last: FrameOutput,
}

impl HeadfulExplorer {
    fn announce(&self, out: &FrameOutput) {
        if out.popup == self.last.popup {
            return;
        }
        if let Some(poi) = out.active_point.as_ref() {
            println!("{}", poi.payload.title);
            if let Some(description) = poi.payload.description.as_deref() {
                println!("  {description}");
            }
            if let Some(url) = poi.payload.url.as_deref() {
                println!("  {url}");
            }
            println!("  (Esc or Enter to close)");
        }
    }
}

impl SceneApp for HeadfulExplorer {
    fn update(&mut self, input: &InputFrame, tick: FrameTick) -> LoopAction {
        let pressed = |key: VirtualKeyCode| input.keys_pressed.contains(&key);

        if pressed(VirtualKeyCode::Escape) || pressed(VirtualKeyCode::Return) {
            let was_open = self.explorer.close_popup();
            if !was_open && pressed(VirtualKeyCode::Escape) {
                return LoopAction::Exit;
            }
        }
        if pressed(VirtualKeyCode::Q) {
            return LoopAction::Exit;
        }
        if pressed(VirtualKeyCode::R) {
            self.explorer.recalibrate();
        }

        self.explorer
            .set_keys(KeySet::from_virtual_keys(input.keys_down.iter()));
        let out = self.explorer.frame(tick);
        self.announce(&out);
        self.last = out;
        LoopAction::Continue
    }

    fn draw(&mut self, canvas: &mut Canvas<'_>) {
        self.minimap
            .draw(canvas, self.explorer.logic().registry(), &self.last);

        if self.last.popup != PopupState::Idle {
            let color = self
                .last
                .active_point
                .as_ref()
                .and_then(|poi| canvas::parse_hex_color(&poi.payload.color))
                .unwrap_or([255, 255, 255, 255]);
            let size = canvas.size();
            let y = size.height.saturating_sub(BANNER_HEIGHT) as i32;
            canvas.fill_rect(0, y, size.width, BANNER_HEIGHT, color);
        }
    }

    fn on_focus_changed(&mut self, focused: bool) {
        if !focused {
            self.explorer.release_keys();
        }
    }

    fn shutdown(&mut self) {
        self.explorer.detach();
        let v = self.last.vehicle;
        tracing::info!(x = v.position.x, z = v.position.z, heading = v.heading, "final pose");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing();

    let settings = SettingsStore::from_env().load();
    let boundary = settings.motion.sanitized().boundary;
    let registry = Registry::portfolio(boundary)?;

    // A desktop window has no tilt sensor.
    if settings.device.resolve_from_env(None) == DeviceClass::Mobile {
        tracing::warn!("mobile control scheme requested; using keyboard controls");
    }
    let logic = ExplorerLogic::new(
        settings,
        registry,
        DeviceClass::Desktop,
        SensorPlatform {
            requires_permission: false,
        },
    );
    let explorer = Explorer::new(logic);
    let last = explorer.output();

    println!("controls: arrows/WASD drive, Esc/Enter close popup, R recalibrate, Q quit");
    let app = HeadfulExplorer {
        explorer,
        minimap: Minimap::new(boundary),
        last,
    };
    app::run_scene(
        AppConfig {
            title: "Shuttle Explorer".to_string(),
            desired_size: PhysicalSize::new(720, 720),
            buffer_size: BUFFER,
            vsync: true,
        },
        app,
    )?;
    Ok(())
}
