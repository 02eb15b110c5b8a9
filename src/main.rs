use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

// DEBUGGING, LOGGING
use simplelog::__private::paris::Logger;
use simplelog::*;

// MY STUFF
use dual_scope::back_end::CpalSink;
use dual_scope::{AudioSink, Command, SessionConfig, StreamingController};

fn main() -> Result<(), anyhow::Error> {
    // LOGGER INIT
    // Accepts every level, the session picks the effective one once it is loaded
    TermLogger::init(
        LevelFilter::Trace,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;
    log::set_max_level(LevelFilter::Info);

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    log::set_max_level(config.log_level);
    let mut logger = Logger::new();

    info!("<b>Running <blue>dual scope</>");
    print_help();

    let mut controller = StreamingController::from_config(&config)?;
    let mut sink = CpalSink::open(&config)?;

    let (quit_tx, quit_rx) = bounded::<()>(1);
    let controls = controller.controls();
    thread::spawn(move || read_commands(controls, quit_tx));

    // Queue the first buffers before the device starts pulling
    controller.tick(&mut sink)?;
    sink.play()?;
    logger.loading("<blue><info></><b> Playing sound</>");

    let tick = Duration::from_millis(config.tick_ms);
    loop {
        match quit_rx.recv_timeout(tick) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        controller.tick(&mut sink)?;
    }

    sink.pause()?;
    logger.done();

    info!(
        "<b>Generated <cyan>{}</> <b>buffers, {:.2} s of audio</>",
        controller.buffers_generated(),
        controller.clock_time()
    );
    info!("<green><tick></> <b>Program finished <green>successfully</>");
    Ok(())
}

/// Forwards stdin commands to the controller until `q` or end of input.
fn read_commands(controls: Sender<Command>, quit: Sender<()>) {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!("<b>Could not read input: <red>{}</>", err);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "q" {
            break;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                if controls.send(command).is_err() {
                    break;
                }
            }
            Err(err) => warn!("<yellow><warn></> <b>{}</>", err),
        }
    }

    let _ = quit.send(());
}

fn print_help() {
    info!("<b>Commands</> (type and press enter):");
    info!("  |_ <cyan>p</>      toggle playback");
    info!("  |_ <cyan>q</>      quit");
    info!("  |_ <cyan>l+a</>    target l/r/b, direction +/-, parameter:");
    info!("       a amplitude, n note, d duty cycle, w next wave");
}
