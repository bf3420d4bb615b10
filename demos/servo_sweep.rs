// Servo sweep: move the given channels back and forth between two pulse widths
//
// Usage: cargo run --example servo_sweep -- [--simulate] [-r] 0 1 2
//
// Every `interval` seconds all listed channels go to pw_min, then pw_max,
// or to random widths in between with --random. Ctrl+C centers the
// servos and releases the chip.

use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use music_box_servo::config::{DEFAULT_I2C_ADDRESS, DEFAULT_I2C_DEVICE, PW_MAX, PW_MIN};
use music_box_servo::servo::pca9685::parse_address;
use music_box_servo::servo::{
    ChannelDriver, Pca9685Device, PulseLimits, PulseWidth, PwmDevice, SimulatedDevice,
};

#[derive(Parser, Debug)]
#[command(version, about = "Test program for the PCA9685 channel driver", long_about = None)]
struct Args {
    /// Channels to move
    #[arg(required = true)]
    channel: Vec<usize>,

    /// Interval between moves [sec]
    #[arg(short, long, default_value_t = 1.0)]
    interval: f64,

    /// Lower pulse width of the sweep
    #[arg(long, default_value_t = PW_MIN)]
    pw_min: u16,

    /// Upper pulse width of the sweep
    #[arg(long, default_value_t = PW_MAX)]
    pw_max: u16,

    /// Random pulse widths instead of min/max alternation
    #[arg(short, long)]
    random: bool,

    #[arg(long, default_value = DEFAULT_I2C_DEVICE)]
    i2c_device: String,

    #[arg(long, default_value_t = DEFAULT_I2C_ADDRESS, value_parser = parse_address)]
    address: u8,

    /// Log device writes instead of driving the PCA9685
    #[arg(long)]
    simulate: bool,

    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let level = if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let sweep = PulseLimits::new(args.pw_min, args.pw_max, 50);
    let interval = Duration::try_from_secs_f64(args.interval)?;
    let channel_count = args.channel.iter().max().map_or(0, |&ch| ch + 1);

    let device: Box<dyn PwmDevice> = if args.simulate {
        Box::new(SimulatedDevice::new())
    } else {
        Box::new(Pca9685Device::open(&args.i2c_device, args.address)?)
    };
    let driver = ChannelDriver::new(
        device,
        channel_count,
        PulseLimits::default(),
        info_span!("sweep"),
    )?;

    info!("Sweeping channels {:?} between {}..{}us", args.channel, sweep.min, sweep.max);

    // center and release the servos however the sweep ends
    let result = sweep_loop(&driver, &args, sweep, interval).await;

    info!("Centering servos");
    let center = PulseWidth::Active(PulseLimits::default().center());
    let mut pws = vec![PulseWidth::NoOp; channel_count];
    for &ch in &args.channel {
        pws[ch] = center;
    }
    driver.set_all(&pws)?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    driver.shutdown().await?;
    result
}

async fn sweep_loop(
    driver: &ChannelDriver,
    args: &Args,
    sweep: PulseLimits,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut count: u64 = 0;
    loop {
        let mut pws = vec![PulseWidth::NoOp; driver.channel_count()];
        for &ch in &args.channel {
            let v = if args.random {
                rand::thread_rng().gen_range(sweep.min..=sweep.max)
            } else if count % 2 == 0 {
                sweep.min
            } else {
                sweep.max
            };
            pws[ch] = PulseWidth::Active(v);
        }

        driver.set_all(&pws)?;
        debug!("snapshot={:?}", driver.snapshot());
        count += 1;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}
