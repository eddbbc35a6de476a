use anyhow::Context;
use clap::Parser;
use gui_bridge::bridge::ScanBridge;
use lidarcore::telemetry::PipelineMetrics;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{ScanConfig, SourceConfig, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Lidar approach-tracking driver")]
struct Args {
    /// Load a scan config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read packets from a serial port
    #[arg(long, conflicts_with_all = ["replay", "raw"])]
    device: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud_rate: u32,
    /// Serial read timeout; an idle port is polled again after this long
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
    /// Read a binary dump of the sensor stream
    #[arg(long, conflicts_with = "replay")]
    raw: Option<PathBuf>,
    /// Replay a hex capture (one frame per line) on simulated time
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Stop the synthetic sensor after N revolutions
    #[arg(long)]
    limit: Option<u64>,
    /// Run N synthetic revolutions on simulated time and emit a summary
    #[arg(long)]
    offline: Option<usize>,
    /// Tee the raw stream into a hex capture file
    #[arg(long)]
    capture: Option<PathBuf>,
    #[arg(long, default_value_t = 5000)]
    proximity_gate_mm: u16,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Serve the latest scene over HTTP and keep it available after the source closes
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn closing_status(metrics: &PipelineMetrics) -> String {
    format!(
        "source closed: {} revolutions, {} frames rejected, {} objects created, {} expired",
        metrics.revolutions,
        metrics.frames_rejected,
        metrics.objects_created,
        metrics.objects_expired
    )
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut scan_config = if let Some(path) = &args.config {
        ScanConfig::load(path)?
    } else {
        let source = match (&args.device, &args.raw, &args.replay) {
            (Some(path), _, _) => SourceConfig::Device {
                path: path.clone(),
                baud_rate: args.baud_rate,
                timeout_ms: args.timeout_ms,
            },
            (None, Some(path), _) => SourceConfig::Raw { path: path.clone() },
            (None, None, Some(path)) => SourceConfig::Replay {
                path: path.clone(),
                revolution_secs: 0.2,
            },
            (None, None, None) => SourceConfig::Synthetic {
                revolutions: args.limit,
            },
        };
        ScanConfig::from_args(source, args.proximity_gate_mm)
    };
    if let Some(path) = args.capture {
        scan_config.capture = Some(path);
    }
    if let Some(bind) = args.bind {
        scan_config.bind = bind;
    }

    let runner = Runner::new(scan_config.clone());

    if let Some(revolutions) = args.offline {
        let summary = runner.run_offline(revolutions)?;
        let nearest = summary
            .last_nearest
            .map(|s| format!("{} mm @ {} deg", s.distance_mm, s.angle))
            .unwrap_or_else(|| "n/a".into());
        let farthest = summary
            .last_farthest
            .map(|s| format!("{} mm @ {} deg", s.distance_mm, s.angle))
            .unwrap_or_else(|| "n/a".into());

        println!(
            "Offline run -> revolutions {}, approaching peak {}, peak speed {:.1} mm/s, last nearest {}, last farthest {}",
            summary.revolutions,
            summary.max_approaching,
            summary.peak_speed_mm_s,
            nearest,
            farthest
        );

        let report = format!(
            "revolutions={} frames={} rejected={} dropped_samples={} objects_created={} objects_expired={} peak_speed_mm_s={:.1}\n",
            summary.revolutions,
            summary.metrics.frames_decoded,
            summary.metrics.frames_rejected,
            summary.metrics.samples_dropped,
            summary.metrics.objects_created,
            summary.metrics.objects_expired,
            summary.peak_speed_mm_s
        );
        let report_path = PathBuf::from("tools/data/offline_tracking.log");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&report_path)
            .with_context(|| format!("opening {}", report_path.display()))?;
        file.write_all(report.as_bytes())?;
        return Ok(());
    }

    let bridge = ScanBridge::new(scan_config.bind);
    if args.serve {
        bridge.serve();
    }

    let mut sink = bridge.sink();
    let metrics = runner.run_live(&mut sink)?;
    bridge.publish_status(&closing_status(&metrics));

    if args.serve {
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
