//! Vent Fan Beat entry point
//!
//! Web: drives the simulator from `requestAnimationFrame` with Web Audio.
//! Native: headless run that logs the accepted-hit rate.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use vent_fan_beat::audio::web::WebAudioBackend;
    use vent_fan_beat::sim::ObstacleRing;
    use vent_fan_beat::{SimulationConfig, Simulator};

    /// Longest frame the simulation will accept (seconds)
    const MAX_FRAME_SECS: f64 = 0.1;

    struct App {
        sim: Simulator<WebAudioBackend>,
        last_time: Option<f64>,
    }

    impl App {
        fn update(&mut self, time_ms: f64) {
            let dt = match self.last_time {
                Some(last) => ((time_ms - last) / 1000.0).min(MAX_FRAME_SECS),
                None => 0.0,
            };
            self.last_time = Some(time_ms);
            self.sim.frame(dt);
        }
    }

    fn request_animation_frame(f: &Closure<dyn FnMut(f64)>) {
        if let Some(window) = web_sys::window() {
            let _ = window.request_animation_frame(f.as_ref().unchecked_ref());
        }
    }

    fn start_loop(app: Rc<RefCell<App>>) {
        let f: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(Closure::new(move |time: f64| {
            app.borrow_mut().update(time);
            if let Some(cb) = f.borrow().as_ref() {
                request_animation_frame(cb);
            }
        }));
        if let Some(cb) = g.borrow().as_ref() {
            request_animation_frame(cb);
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Vent Fan Beat starting...");

        let config = SimulationConfig {
            seed: js_sys::Date::now() as u64,
            ..Default::default()
        };
        let obstacles = ObstacleRing::evenly_spaced(4);
        let app = Rc::new(RefCell::new(App {
            sim: Simulator::new(config, obstacles),
            last_time: None,
        }));

        // Audio comes up asynchronously; hits before then are dropped
        {
            let app = app.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = WebAudioBackend::initialize(0.8).await;
                let _ = app.borrow_mut().sim.attach_audio(result);
            });
        }

        start_loop(app);
        log::info!("Vent Fan Beat running!");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use vent_fan_beat::audio::NullBackend;
    use vent_fan_beat::sim::ObstacleRing;
    use vent_fan_beat::{SimulationConfig, Simulator};

    const FRAME_DT: f64 = 1.0 / 60.0;

    env_logger::init();
    log::info!("Vent Fan Beat (headless) starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| SimulationConfig::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => SimulationConfig::default(),
    };
    let seconds: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(5);

    let mut sim: Simulator<NullBackend> =
        Simulator::new(config, ObstacleRing::evenly_spaced(4));
    if let Err(e) = sim.attach_audio(Ok(NullBackend::new())) {
        log::error!("Audio setup failed: {}", e);
    }

    for second in 1..=seconds {
        let mut accepted = 0;
        let mut stolen = 0;
        for _ in 0..60 {
            let report = sim.frame(FRAME_DT);
            accepted += report.accepted;
            stolen += report.stolen;
        }
        println!(
            "t={:>3}s  hits={:>3}  stolen={:>3}  rate(1s)={}",
            second,
            accepted,
            stolen,
            sim.context().hit_rate()
        );
    }

    if let Some(backend) = sim.backend_mut() {
        log::info!(
            "Done: {} voices started, {} released early",
            backend.voices_started,
            backend.voices_released
        );
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
