// FluxSand - Firmware Entry Point
//
// Boot sequence:
//   1. Initialise logging.
//   2. Load and validate the runtime config (argv[1] or FLUXSAND_CONFIG).
//   3. Load the gyro calibration blob (zero bias if unusable).
//   4. Open the classifier, bind labels, build the gesture pipeline.
//   5. Bring up the peripherals (real board or host simulation).
//   6. Spawn sensor, AHRS, gesture, sand, UI, environment, buzzer and
//      button threads.
//
// Any configuration fault stops the boot before a single thread runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU8;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::Context;

use fluxsand::ahrs::Ahrs;
use fluxsand::calibration;
use fluxsand::classifier::{self, Classifier};
use fluxsand::config::*;
use fluxsand::controller::Controller;
use fluxsand::display::Frame;
use fluxsand::drivers::{Buzzer, EnvSource, ImuSource, MatrixDisplay};
use fluxsand::events::ButtonId;
use fluxsand::gesture::GesturePipeline;
use fluxsand::mailbox::{GravityCell, Mailbox, Shutdown};
use fluxsand::math::Vector3;
use fluxsand::tasks;
use fluxsand::tasks::sand::{SandAnimator, SandShared};

/// Peripherals handed to the worker threads.
struct Devices<I, E, D, B, F> {
    imu: I,
    env: E,
    display: D,
    buzzer: B,
    /// Button level reader; absent on the host.
    buttons: Option<F>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------
fn main() -> anyhow::Result<()> {
    init_logging();
    log::info!("FluxSand firmware starting...");

    // ---- Configuration ----------------------------------------------------
    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("FLUXSAND_CONFIG"))
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("refusing to start")?;
    log::info!("Config: {config:?}");

    // ---- Calibration ------------------------------------------------------
    let bias = calibration::load(Path::new(&config.calibration_path));

    // ---- Gesture model ----------------------------------------------------
    let model = classifier::open(&config.model_path, config.feature_layout)
        .with_context(|| format!("cannot open model {}", config.model_path))?;
    let labels = classifier::load_labels(config.labels_path.as_deref().map(Path::new), model.shape().classes)
        .context("refusing to start")?;
    let pipeline = GesturePipeline::new(model, &config, labels).context("refusing to start")?;

    // ---- Peripherals and threads ------------------------------------------
    let shutdown = Shutdown::new();
    let devices = board::init()?;
    let handles = spawn_workers(&config, pipeline, bias, devices, &shutdown)?;
    log::info!("Boot complete, {} threads running", handles.len());

    board::wait(&shutdown);

    for handle in handles {
        let name = handle.thread().name().unwrap_or("?").to_owned();
        if handle.join().is_err() {
            log::error!("Thread {name} panicked");
        }
    }
    log::info!("FluxSand stopped");
    Ok(())
}

#[cfg(target_os = "espidf")]
fn init_logging() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
}

#[cfg(not(target_os = "espidf"))]
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn spawn<F>(name: &str, stack: usize, f: F) -> anyhow::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .stack_size(stack)
        .spawn(f)
        .with_context(|| format!("cannot spawn {name} thread"))
}

fn spawn_workers<I, E, D, B, F>(
    config: &Config,
    pipeline: GesturePipeline<Box<dyn Classifier>>,
    bias: Vector3,
    devices: Devices<I, E, D, B, F>,
    shutdown: &Shutdown,
) -> anyhow::Result<Vec<JoinHandle<()>>>
where
    I: ImuSource + 'static,
    E: EnvSource + 'static,
    D: MatrixDisplay + 'static,
    B: Buzzer + 'static,
    F: FnMut(ButtonId) -> bool + Send + 'static,
{
    let Devices {
        imu,
        env,
        display,
        buzzer,
        buttons,
    } = devices;

    // ---- Handoffs ---------------------------------------------------------
    let sensor_box = Arc::new(Mailbox::new());
    let orientation_box = Arc::new(Mailbox::new());
    let gravity = GravityCell::default();
    let sand = SandShared::new();
    let frame = Arc::new(Mutex::new(Frame::new()));
    let intensity = Arc::new(AtomicU8::new(DEFAULT_INTENSITY));
    let (ui_tx, ui_rx) = mpsc::channel();
    let (beep_tx, beep_rx) = mpsc::channel();

    let mut handles = Vec::new();

    // Sensor reader
    let reader = tasks::sensor::SensorReader::new(imu, bias, PathBuf::from(&config.calibration_path));
    let (out, stop) = (Arc::clone(&sensor_box), shutdown.clone());
    handles.push(spawn("sensor", STACK_SENSOR, move || {
        tasks::sensor::sensor_task(reader, out, stop)
    })?);

    // Orientation filter
    let ahrs = Ahrs::from_config(config);
    let (input, out, cell, stop) = (sensor_box, Arc::clone(&orientation_box), gravity.clone(), shutdown.clone());
    handles.push(spawn("ahrs", STACK_AHRS, move || {
        tasks::ahrs::ahrs_task(ahrs, input, out, cell, stop)
    })?);

    // Gesture inference
    let (tx, stop) = (ui_tx.clone(), shutdown.clone());
    handles.push(spawn("gesture", STACK_GESTURE, move || {
        tasks::gesture::gesture_task(pipeline, orientation_box, tx, stop)
    })?);

    // Sand automaton
    let animator = SandAnimator::new(config.sand_seed);
    let (shared, stop) = (Arc::clone(&sand), shutdown.clone());
    handles.push(spawn("sand", STACK_SAND, move || {
        tasks::sand::sand_task(animator, shared, gravity, stop)
    })?);

    // Environment
    let (tx, level, stop) = (ui_tx.clone(), Arc::clone(&intensity), shutdown.clone());
    handles.push(spawn("env", STACK_ENV, move || tasks::env::env_task(env, tx, level, stop))?);

    // Buzzer
    let stop = shutdown.clone();
    handles.push(spawn("buzzer", STACK_BUZZER, move || {
        tasks::buzzer::buzzer_task(buzzer, beep_rx, stop)
    })?);

    // Buttons
    if let Some(read) = buttons {
        let (tx, stop) = (ui_tx.clone(), shutdown.clone());
        handles.push(spawn("buttons", STACK_BUTTONS, move || {
            tasks::buttons::button_task(read, tx, stop)
        })?);
    }

    // UI (controller + renderer)
    let ui = tasks::ui::Ui::new(Controller::new(), sand, beep_tx, frame);
    let stop = shutdown.clone();
    handles.push(spawn("ui", STACK_UI, move || {
        tasks::ui::ui_task(ui, display, ui_rx, intensity, stop)
    })?);
    drop(ui_tx);

    Ok(handles)
}

// ---------------------------------------------------------------------------
// Device board
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
mod board {
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{Input, PinDriver, Pull};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig};

    use fluxsand::config::DEFAULT_INTENSITY;
    use fluxsand::drivers::buzzer::PwmBuzzer;
    use fluxsand::drivers::env::EnvSensors;
    use fluxsand::drivers::imu::Mpu9250;
    use fluxsand::drivers::max7219::Max7219;
    use fluxsand::drivers::SharedBus;
    use fluxsand::events::ButtonId;
    use fluxsand::mailbox::Shutdown;

    use super::Devices;

    type Buttons = Box<dyn FnMut(ButtonId) -> bool + Send>;

    pub fn init() -> anyhow::Result<Devices<Mpu9250, EnvSensors, Max7219, PwmBuzzer, Buttons>> {
        let peripherals = Peripherals::take()?;

        // ---- I2C bus (shared between IMU and environment sensors) ---------
        let i2c_config = I2cConfig::new().baudrate(400u32.kHz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio6, // SDA
            peripherals.pins.gpio7, // SCL
            &i2c_config,
        )?;
        let i2c_bus: SharedBus = Box::leak(Box::new(Mutex::new(i2c)));

        let imu = Mpu9250::new(i2c_bus);
        imu.init()?;

        let mut env = EnvSensors::new(i2c_bus);
        if let Err(e) = env.init() {
            // The clock and sand still work without it.
            log::error!("Environment sensors unavailable: {e}");
        }

        // ---- LED matrix on SPI ---------------------------------------------
        let spi = SpiDriver::new(
            peripherals.spi2,
            peripherals.pins.gpio9, // CLK
            peripherals.pins.gpio8, // DIN
            Option::<esp_idf_hal::gpio::AnyIOPin>::None,
            &SpiDriverConfig::new(),
        )?;
        let spi = SpiDeviceDriver::new(
            spi,
            Some(peripherals.pins.gpio10), // CS
            &SpiConfig::new().baudrate(10u32.MHz().into()),
        )?;
        let mut display = Max7219::new(spi);
        display.init(DEFAULT_INTENSITY)?;

        // ---- Buzzer on LEDC timer 0 ----------------------------------------
        let timer = LedcTimerDriver::new(peripherals.ledc.timer0, &TimerConfig::new().frequency(2u32.kHz().into()))?;
        let channel = LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio5)?;
        // Dropping the timer driver would stop the PWM clock.
        std::mem::forget(timer);
        let buzzer = PwmBuzzer::new(channel);

        // ---- Buttons (pull-up, active LOW) ---------------------------------
        let mut mode: PinDriver<'static, _, Input> = PinDriver::input(peripherals.pins.gpio3)?;
        mode.set_pull(Pull::Up)?;
        let mut action: PinDriver<'static, _, Input> = PinDriver::input(peripherals.pins.gpio4)?;
        action.set_pull(Pull::Up)?;
        let buttons: Buttons = Box::new(move |id| match id {
            ButtonId::Mode => mode.is_low(),
            ButtonId::Action => action.is_low(),
        });

        log::info!("Board peripherals ready");
        Ok(Devices {
            imu,
            env,
            display,
            buzzer,
            buttons: Some(buttons),
        })
    }

    /// Firmware never exits; park the main thread.
    pub fn wait(_shutdown: &Shutdown) {
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------
#[cfg(not(target_os = "espidf"))]
mod board {
    use std::thread;
    use std::time::{Duration, Instant};

    use fluxsand::drivers::sim::{AsciiDisplay, LogBuzzer, SimEnv, SimImu};
    use fluxsand::events::ButtonId;
    use fluxsand::mailbox::Shutdown;

    use super::Devices;

    pub fn init() -> anyhow::Result<Devices<SimImu, SimEnv, AsciiDisplay, LogBuzzer, fn(ButtonId) -> bool>> {
        log::info!("Running on simulated peripherals");
        Ok(Devices {
            imu: SimImu::new(None),
            env: SimEnv::default(),
            display: AsciiDisplay::new(),
            buzzer: LogBuzzer,
            buttons: None,
        })
    }

    /// Run until FLUXSAND_RUN_SECS elapses, or forever when unset.
    pub fn wait(shutdown: &Shutdown) {
        let limit = std::env::var("FLUXSAND_RUN_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        let start = Instant::now();
        loop {
            thread::sleep(Duration::from_millis(200));
            if limit.is_some_and(|limit| start.elapsed() >= limit) {
                log::info!("Run time elapsed, shutting down");
                shutdown.request();
                return;
            }
        }
    }
}
