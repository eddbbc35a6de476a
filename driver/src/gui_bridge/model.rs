use lidarcore::prelude::Sample;
use lidarcore::telemetry::PipelineMetrics;
use lidarcore::RevolutionReport;
use serde::{Deserialize, Serialize};

/// Half-width of the plotted area.
pub const PLOT_LIMIT_CM: f32 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PlotPoint {
    pub x_cm: f32,
    pub y_cm: f32,
}

impl PlotPoint {
    /// Polar sensor reading to plot coordinates, millimetres to centimetres.
    pub fn from_polar(angle_deg: u16, distance_mm: u16) -> Self {
        let radians = (angle_deg as f32).to_radians();
        let distance_cm = distance_mm as f32 / 10.0;
        Self {
            x_cm: distance_cm * radians.cos(),
            y_cm: distance_cm * radians.sin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledMarker {
    pub point: PlotPoint,
    pub distance_cm: f32,
    pub label: String,
}

impl LabeledMarker {
    fn from_sample(prefix: &str, sample: &Sample) -> Self {
        let distance_cm = sample.distance_mm as f32 / 10.0;
        Self {
            point: PlotPoint::from_polar(sample.angle, sample.distance_mm),
            distance_cm,
            label: format!("{}: {:.1}cm", prefix, distance_cm),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachMarker {
    pub angle: u16,
    pub point: PlotPoint,
    pub distance_cm: f32,
    pub speed_cm_s: f32,
    pub label: String,
}

/// Draw-ready view of one revolution, served to the visualizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanScene {
    pub revolution: usize,
    pub timestamp: f64,
    pub points: Vec<PlotPoint>,
    pub nearest: Option<LabeledMarker>,
    pub farthest: Option<LabeledMarker>,
    pub approaching: Vec<ApproachMarker>,
    pub alert: Option<String>,
    pub limit_cm: f32,
    pub sensor_rpm: Option<f64>,
    pub metrics: PipelineMetrics,
}

impl Default for ScanScene {
    fn default() -> Self {
        Self {
            revolution: 0,
            timestamp: 0.0,
            points: Vec::new(),
            nearest: None,
            farthest: None,
            approaching: Vec::new(),
            alert: None,
            limit_cm: PLOT_LIMIT_CM,
            sensor_rpm: None,
            metrics: PipelineMetrics::default(),
        }
    }
}

impl ScanScene {
    pub fn from_report(report: &RevolutionReport) -> Self {
        let points = report
            .samples
            .iter()
            .map(|sample| PlotPoint::from_polar(sample.angle, sample.distance_mm))
            .collect();

        let approaching: Vec<ApproachMarker> = report
            .tracked
            .values()
            .map(|object| {
                let distance_cm = object.distance_mm as f32 / 10.0;
                let speed_cm_s = (object.closing_speed_mm_s / 10.0) as f32;
                ApproachMarker {
                    angle: object.angle,
                    point: PlotPoint::from_polar(object.angle, object.distance_mm),
                    distance_cm,
                    speed_cm_s,
                    label: format!(
                        "Approaching: {:.1}cm\nSpeed: {:.2}cm/s",
                        distance_cm, speed_cm_s
                    ),
                }
            })
            .collect();

        let alert = (!approaching.is_empty()).then(|| {
            format!("Alert: {} object(s) approaching!", approaching.len())
        });

        Self {
            revolution: report.metrics.revolutions,
            timestamp: report.timestamp,
            points,
            nearest: Some(LabeledMarker::from_sample("Nearest", &report.nearest)),
            farthest: Some(LabeledMarker::from_sample("Farthest", &report.farthest)),
            approaching,
            alert,
            limit_cm: PLOT_LIMIT_CM,
            sensor_rpm: report.sensor_rpm,
            metrics: report.metrics,
        }
    }
}
