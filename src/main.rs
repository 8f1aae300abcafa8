use clap::Parser;
use eframe::egui;
use embassy_executor::{Executor, Spawner};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use env_logger::Builder;
use log::{LevelFilter, error, info};
use std::path::PathBuf;
use std::thread;

mod common;
mod simulation;
mod ui;

use crate::common::run_log::DEFAULT_RUN_LOG;
use crate::simulation::headless;
use crate::simulation::log_capture::{TeeLogger, init_log_capture};
use crate::ui::{AppState, UICommand, UIRefreshState};

const UI_REFRESH_QUEUE_SIZE: usize = 64;
const UI_COMMAND_QUEUE_SIZE: usize = 16;

type UIRefreshQueue = Channel<CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
type UIRefreshQueueReceiver = Receiver<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
type UIRefreshQueueSender = Sender<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;

type UICommandQueue = Channel<CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;
type UICommandQueueReceiver = Receiver<'static, CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;
type UICommandQueueSender = Sender<'static, CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;

/// Wireless sensor network coverage simulator.
#[derive(Parser, Debug)]
#[command(name = "wsn-coverage-simulator", version, about = "Energy-aware coverage simulator for wireless sensor networks")]
struct Cli {
    /// Configuration file loaded at startup (required with --headless).
    config: Option<PathBuf>,

    /// Run without the GUI until the simulation terminates and print the summary as JSON.
    #[arg(long, requires = "config")]
    headless: bool,

    /// Run log appended when a headless run terminates.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_RUN_LOG, requires = "headless")]
    log: PathBuf,
}

fn init_logging() {
    let inner = Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("wsn_coverage_simulator"), LevelFilter::Debug)
        .parse_default_env()
        .build();
    let logger = TeeLogger::new(inner);
    let max_level = logger.filter();

    init_log_capture();
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}

fn embassy_init(spawner: Spawner, ui_refresh_tx: UIRefreshQueueSender, ui_command_rx: UICommandQueueReceiver, config: Option<PathBuf>) {
    let _ = spawner.spawn(simulation::simulation_task(ui_refresh_tx, ui_command_rx, config, PathBuf::from(DEFAULT_RUN_LOG)));
}

fn run_headless(config: PathBuf, log_path: PathBuf) -> i32 {
    match headless::run(&config, &log_path) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                error!("Failed to serialize run summary: {}", e);
                1
            }
        },
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

fn run_gui(config: Option<PathBuf>) {
    let ui_refresh_channel: &'static UIRefreshQueue = Box::leak(Box::new(UIRefreshQueue::new()));
    let ui_command_channel: &'static UICommandQueue = Box::leak(Box::new(UICommandQueue::new()));

    let ui_refresh_tx = ui_refresh_channel.sender();
    let ui_refresh_rx = ui_refresh_channel.receiver();
    let ui_command_tx = ui_command_channel.sender();
    let ui_command_rx = ui_command_channel.receiver();

    // Spawn Embassy executor on a dedicated background thread
    let _embassy_handle = thread::Builder::new()
        .name("embassy-executor".to_string())
        .spawn(move || {
            // Leak the executor to satisfy the 'static lifetime required by run()
            let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
            executor.run(|spawner| embassy_init(spawner, ui_refresh_tx, ui_command_rx, config));
        })
        .expect("failed to spawn embassy thread");

    // Start the GUI on the main thread (required on macOS)
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]),
        ..Default::default()
    };
    if let Err(e) = eframe::run_native(
        "WSN Coverage Simulator",
        native_options,
        Box::new(move |cc| Ok(Box::new(AppState::new(ui_refresh_rx, ui_command_tx, cc.storage)))),
    ) {
        error!("GUI terminated with error: {}", e);
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    info!("Starting up");

    match cli.config {
        Some(config) if cli.headless => std::process::exit(run_headless(config, cli.log)),
        config => run_gui(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("wsn-coverage-simulator").chain(args.iter().copied()))
    }

    #[test]
    fn gui_mode_with_optional_config() {
        let cli = parse(&[]).unwrap();
        assert!(!cli.headless);
        assert_eq!(cli.config, None);

        let cli = parse(&["scenarios/default.toml"]).unwrap();
        assert!(!cli.headless);
        assert_eq!(cli.config, Some(PathBuf::from("scenarios/default.toml")));
    }

    #[test]
    fn headless_mode_defaults_the_run_log() {
        let cli = parse(&["--headless", "a.toml"]).unwrap();
        assert!(cli.headless);
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
        assert_eq!(cli.log, PathBuf::from(DEFAULT_RUN_LOG));

        let cli = parse(&["a.toml", "--headless", "--log", "out.txt"]).unwrap();
        assert!(cli.headless);
        assert_eq!(cli.log, PathBuf::from("out.txt"));
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert!(parse(&["--headless"]).is_err());
        assert!(parse(&["--log"]).is_err());
        assert!(parse(&["--log", "x.txt"]).is_err());
        assert!(parse(&["a.toml", "b.toml"]).is_err());
        assert!(parse(&["--fast"]).is_err());
    }

    #[test]
    fn command_line_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
