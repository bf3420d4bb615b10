// Interactive music box servo test program
//
// Each prompt line taps a set of channels: either a comma-separated list
// (`0, 2, 4`) or a hole pattern prefixed with `!` (`!--o-o-o--`).
// `?` prints the last commanded pulse widths, an empty line exits.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, info_span};
use tracing_subscriber::EnvFilter;

use music_box_servo::config::{
    DEFAULT_CONF_FILE, DEFAULT_I2C_ADDRESS, DEFAULT_I2C_DEVICE, DEFAULT_OFF_INTERVAL,
    DEFAULT_ON_INTERVAL, DEFAULT_SERVO_N,
};
use music_box_servo::music_box::{ChannelTable, MusicBoxActuator};
use music_box_servo::request::{Request, parse_request};
use music_box_servo::servo::pca9685::{OUTPUT_COUNT, parse_address};
use music_box_servo::servo::{
    ChannelDriver, Pca9685Device, PulseLimits, PwmDevice, SimulatedDevice,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(version, about = "Music box servo test program", long_about = None)]
struct Args {
    /// Configuration file (channel, on, off per line)
    #[arg(short = 'c', long = "conf", short_alias = 'f', default_value = DEFAULT_CONF_FILE)]
    conf: PathBuf,

    /// Push hold time [sec]
    #[arg(short = 'o', long, default_value_t = DEFAULT_ON_INTERVAL)]
    on_interval: f64,

    /// Pull hold time [sec]
    #[arg(short = 'O', long, default_value_t = DEFAULT_OFF_INTERVAL)]
    off_interval: f64,

    /// Number of servos
    #[arg(short = 's', long, default_value_t = DEFAULT_SERVO_N)]
    servo_n: usize,

    /// I2C bus device
    #[arg(long, default_value = DEFAULT_I2C_DEVICE)]
    i2c_device: String,

    /// PCA9685 address (e.g. 0x40)
    #[arg(long, default_value_t = DEFAULT_I2C_ADDRESS, value_parser = parse_address)]
    address: u8,

    /// Log device writes instead of driving the PCA9685
    #[arg(long)]
    simulate: bool,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging (RUST_LOG overrides, --debug raises the default)
    let level = if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), BoxError> {
    debug!("{:?}", args);

    if args.servo_n > OUTPUT_COUNT {
        return Err(format!(
            "servo_n {} exceeds the {} outputs of the PCA9685",
            args.servo_n, OUTPUT_COUNT
        )
        .into());
    }
    let on_interval = Duration::try_from_secs_f64(args.on_interval)?;
    let off_interval = Duration::try_from_secs_f64(args.off_interval)?;

    let limits = PulseLimits::default();
    let mut table = ChannelTable::new(args.servo_n, limits.center());
    table.load_file(&args.conf)?;

    let device: Box<dyn PwmDevice> = if args.simulate {
        info!("Simulating PCA9685");
        Box::new(SimulatedDevice::new())
    } else {
        Box::new(Pca9685Device::open(&args.i2c_device, args.address)?)
    };

    let driver = ChannelDriver::new(device, args.servo_n, limits, info_span!("driver"))?;
    let actuator = MusicBoxActuator::new(
        driver,
        table,
        on_interval,
        off_interval,
        info_span!("music_box"),
    )?;

    let result = prompt_loop(&actuator).await;
    actuator.shutdown().await?;
    info!("end");
    result
}

async fn prompt_loop(actuator: &MusicBoxActuator) -> Result<(), BoxError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let prompt = format!("[0-{}, ..]> ", actuator.channel_count().saturating_sub(1));

    loop {
        print!("{}", prompt);
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else {
            info!("EOF");
            break;
        };
        debug!("line={:?}", line);

        let channels = match parse_request(&line) {
            Ok(Request::Quit) => break,
            Ok(Request::Status) => {
                println!("{}", serde_json::to_string(&*actuator.driver().snapshot())?);
                continue;
            }
            Ok(Request::Tap(channels)) => channels,
            Err(e) => {
                error!("{} .. ignored", e);
                continue;
            }
        };

        match actuator.tap(&channels).await {
            Ok(()) => {}
            Err(e) if e.is_rejected_input() => error!("{} .. ignored", e),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
