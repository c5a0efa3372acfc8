use clap::{Parser, ValueEnum};
use mpu6000_driver::{cli, config_file, init_tracing, load_driver_config, SensorMessage};
use mpu6000_driver::{TokioScheduler, TopicBus};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "mpu6000", about = "MPU-6000 accelerometer/gyroscope driver")]
struct Args {
    /// Driver config file (default: $CONFIG_PATH/mpu6000.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the driver running after the commands until Ctrl-C
    #[arg(long)]
    hold: bool,

    /// Print `test` reports as JSON
    #[arg(long)]
    json: bool,

    /// Commands, run in order
    #[arg(value_enum, required = true)]
    commands: Vec<CliCommand>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CliCommand {
    Start,
    Test,
    Info,
    Stop,
}

fn print_report(msg: &SensorMessage) {
    match msg {
        SensorMessage::Accel(r) => {
            println!("single read");
            println!("time:        {}", r.timestamp);
            println!("x:           {}", r.x);
            println!("y:           {}", r.y);
            println!("z:           {}", r.z);
            println!("temperature: {}", r.temperature);
        }
        SensorMessage::Gyro(r) => {
            println!("single read");
            println!("time:        {}", r.timestamp);
            println!("x:           {}", r.x);
            println!("y:           {}", r.y);
            println!("z:           {}", r.z);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let path = args.config.clone().unwrap_or_else(config_file);
    let config = load_driver_config(&path)?;
    info!("[config] loaded {}", path.display());

    let name = config.driver.name.clone();
    let scheduler = Arc::new(TokioScheduler::new());
    let topics = TopicBus::new();

    for command in &args.commands {
        match command {
            CliCommand::Start => {
                cli::start(&config, scheduler.clone(), topics.clone()).await?;
            }
            CliCommand::Test => match cli::test(&name).await {
                Ok(report) if args.json => println!("{}", report.to_json()?),
                Ok(report) => {
                    print_report(&report);
                    println!("MPU6000: test OK");
                }
                Err(e) => println!("MPU6000: {}", e),
            },
            CliCommand::Info => match cli::info(&name).await {
                Ok(info) => println!("{}", info),
                Err(e) => eprintln!("MPU6000: {}", e),
            },
            CliCommand::Stop => cli::stop(&name).await?,
        }
    }

    if args.hold {
        info!("[main] running, Ctrl-C to stop");
        let mut summary = interval(Duration::from_secs(5));
        summary.tick().await;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = summary.tick() => {
                    for topic in topics.stats().await {
                        info!("[{}] {} published", topic.name, topic.messages_published);
                    }
                }
            }
        }
    }

    if mpu6000_driver::registry::lookup(&name).await.is_some() {
        if let Err(e) = cli::stop(&name).await {
            error!("[main] stop failed: {}", e);
        }
    }
    Ok(())
}
