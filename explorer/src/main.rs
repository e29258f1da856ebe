use std::io;
use std::path::PathBuf;

use engine::HeadlessRunner;

use explorer::input::{ControlScheme, DriveKey, KeySet};
use explorer::logging;
use explorer::orientation::{SensorPlatform, TiltReading};
use explorer::registry::Registry;
use explorer::scene::{ExplorerLogic, FrameInput};
use explorer::sensor_feed::SensorEvent;
use explorer::settings::SettingsStore;
use explorer::triggers::PopupState;

const MAX_FRAMES: usize = 600;
const COAST_FRAMES: usize = 30;

#[derive(Debug, Default)]
struct Cli {
    help: bool,
    record_path: Option<PathBuf>,
    registry_path: Option<PathBuf>,
}

fn parse_cli() -> io::Result<Cli> {
    let mut cli = Cli::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => cli.help = true,
            "--record" => {
                let Some(path) = args.next() else {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "--record requires a path",
                    ));
                };
                cli.record_path = Some(PathBuf::from(path));
            }
            "--registry" => {
                let Some(path) = args.next() else {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "--registry requires a path",
                    ));
                };
                cli.registry_path = Some(PathBuf::from(path));
            }
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unknown argument: {other} (try --help)"),
                ));
            }
        }
    }
    Ok(cli)
}

fn print_help() {
    println!("explorer: headless drive from the origin to the contact point");
    println!();
    println!("  --record <path>    save the frame history as JSON");
    println!("  --registry <path>  load points of interest from a JSON file");
    println!();
    println!("env: EXPLORER_SETTINGS_PATH, EXPLORER_FORCE_DEVICE=desktop|mobile, RUST_LOG");
}

/// Full thrust straight ahead on whichever channel the scheme listens to.
fn thrust_input(scheme: ControlScheme, frame: usize) -> FrameInput {
    match scheme {
        ControlScheme::Desktop => FrameInput::keys(KeySet::from_keys([DriveKey::Forward])),
        ControlScheme::Mobile => {
            // First reading becomes the neutral pose; leaning back 30 degrees is full thrust.
            let beta = if frame == 0 { 40.0 } else { 10.0 };
            FrameInput::tilt(vec![SensorEvent::new(TiltReading::beta_gamma(beta, 0.0), 0)])
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing();

    let cli = parse_cli()?;
    if cli.help {
        print_help();
        return Ok(());
    }

    let store = SettingsStore::from_env();
    let settings = store.load();
    tracing::debug!(path = %store.path().display(), "settings loaded");

    let boundary = settings.motion.sanitized().boundary;
    let registry = match cli.registry_path.as_ref() {
        Some(path) => Registry::load_json_file(path, boundary)?,
        None => Registry::portfolio(boundary)?,
    };
    let device = settings.device.resolve_from_env(None);
    let logic = ExplorerLogic::new(
        settings,
        registry,
        device,
        SensorPlatform {
            requires_permission: false,
        },
    );
    let scheme = logic.scheme();
    let mut runner = HeadlessRunner::new(logic);

    let mut reached = None;
    for frame in 0..MAX_FRAMES {
        runner.step(thrust_input(scheme, frame));
        let popup = runner.state().triggers.popup_state();
        if popup != PopupState::Idle {
            reached = Some(popup);
            break;
        }
    }

    match reached {
        Some(popup) => {
            let vehicle = runner.state().vehicle;
            tracing::info!(
                frame = runner.frame(),
                elapsed_ms = runner.elapsed().as_millis() as u64,
                ?popup,
                x = vehicle.position.x,
                z = vehicle.position.z,
                "popup opened"
            );
            runner.step(FrameInput::close());
            runner.run((0..COAST_FRAMES).map(|_| FrameInput::default()));
        }
        None => tracing::warn!(frames = MAX_FRAMES, "no point of interest reached"),
    }

    let output = runner.logic().output(runner.state());
    println!(
        "frame {} position ({:.2}, {:.2}, {:.2}) heading {:.3} speed {:.4} popup {:?}",
        runner.frame(),
        output.vehicle.position.x,
        output.vehicle.position.y,
        output.vehicle.position.z,
        output.vehicle.heading,
        output.vehicle.speed(),
        output.popup,
    );

    if let Some(path) = cli.record_path {
        runner.timemachine().save_json_file(&path)?;
        println!("saved {} frames to {}", runner.history().len(), path.display());
    }
    Ok(())
}
