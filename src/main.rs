use std::path::Path;
use std::sync::Arc;

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use log::{info, warn};

use faraday_rs::config::ProcessConfig;
use faraday_rs::controller::{ControlCommand, ControlCommandChannel, PlatingController};
use faraday_rs::psu::{run_psu_worker, PsuLink, PsuReplyChannel, PsuRequestChannel, SimulatedPsu};
use faraday_rs::timefmt::format_time;
use faraday_rs::types::ProcessState;

#[embassy_executor::task]
async fn psu_worker_task(
    transport: SimulatedPsu,
    requests: Arc<PsuRequestChannel>,
    replies: Arc<PsuReplyChannel>,
) {
    run_psu_worker(transport, requests, replies).await;
}

#[embassy_executor::task]
async fn controller_task(mut controller: PlatingController) {
    controller.run().await;
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting plating process controller");

    let config = match ProcessConfig::load(Path::new("faraday.json")) {
        Ok(config) => config,
        Err(e) => {
            warn!("config load failed: {:?} - using defaults", e);
            ProcessConfig::default()
        }
    };
    info!("simulating instrument at {}", config.psu.resource);

    let requests = Arc::new(PsuRequestChannel::new());
    let replies = Arc::new(PsuReplyChannel::new());
    let control_channel = Arc::new(ControlCommandChannel::new());

    let link = PsuLink::new(Arc::clone(&requests), Arc::clone(&replies));
    let controller = PlatingController::new(&config, link, Arc::clone(&control_channel));
    let state_handle = controller.state_manager().get_state_handle();

    spawner
        .spawn(psu_worker_task(SimulatedPsu::new(), requests, replies))
        .expect("failed to spawn PSU worker task");
    spawner
        .spawn(controller_task(controller))
        .expect("failed to spawn controller task");

    // Demonstration run against the simulator: a thin deposit finishes in
    // under a minute.
    control_channel.send(ControlCommand::Connect).await;
    control_channel
        .send(ControlCommand::SetParameters {
            thickness_um: 0.1,
            area_cm2: 50.0,
            complexity_level: 1,
        })
        .await;
    control_channel.send(ControlCommand::StartPlating).await;

    loop {
        Timer::after(Duration::from_secs(5)).await;
        let snapshot = state_handle.lock().await.clone();
        info!(
            "[{:?}] {}% elapsed {} of {}",
            snapshot.process_state,
            snapshot.progress.progress_percent,
            format_time(snapshot.progress.elapsed_sec as f64),
            format_time(snapshot.targets.estimated_time_sec)
        );
        if snapshot.process_state == ProcessState::Complete {
            info!("demonstration run complete");
            break;
        }
    }

    control_channel.send(ControlCommand::Disconnect).await;
    Timer::after(Duration::from_secs(1)).await;
    std::process::exit(0);
}
