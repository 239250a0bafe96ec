use aulod_config::AulodConfig;
use aulod_core::ServerState;
use aulod_engine::AulodEngine;
use aulos_control::{ClientId, PORT_INPUT, PORT_OUTPUT};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/aulod.toml".into());
    let config = AulodConfig::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(?config, "aulod starting");

    let server = Arc::new(ServerState::new(config.sample_rate, config.buffer_frames));

    // Control plane: stage graph edits while the cycle loop runs. Each edit
    // becomes visible to the engine at its next cycle entry.
    let control = Arc::clone(&server);
    let control_thread = std::thread::spawn(move || {
        let graph = &control.graph;

        let capture = graph
            .register_port(ClientId(0), PORT_OUTPUT, 0)
            .expect("port table full");
        let playback_l = graph
            .register_port(ClientId(1), PORT_INPUT, 0)
            .expect("port table full");
        let playback_r = graph
            .register_port(ClientId(1), PORT_INPUT, 1)
            .expect("port table full");

        graph.connect(capture, playback_l);
        info!(?capture, ?playback_l, "wired capture to left playback");

        std::thread::sleep(Duration::from_millis(50));
        graph.connect(capture, playback_r);
        info!(?capture, ?playback_r, "wired capture to right playback");

        std::thread::sleep(Duration::from_millis(50));
        control.engine.configure(|c| {
            c.cpu_load_permille = 0;
        });
    });

    let mut engine = AulodEngine::new(Arc::clone(&server));
    engine.run(config.cycles);

    control_thread.join().expect("control thread panicked");

    let graph = server.graph.snapshot();
    let ctl = server.engine.snapshot();
    info!(
        ports = graph.port_count(),
        wires = graph.connection_count(),
        xruns = ctl.xrun_count,
        frames = engine.frames_processed(),
        late_cycles = engine.late_cycles(),
        "aulod shutting down"
    );

    Ok(())
}
