use iced::{
    mouse, time,
    widget::{
        canvas::{self, Canvas, Frame, Geometry, Path, Stroke, Text},
        column, row, scrollable, text, Column, Container,
    },
    Alignment, Color, Element, Length, Pixels, Point, Rectangle, Renderer, Subscription, Task,
    Theme,
};
use lidarcore::telemetry::PipelineMetrics;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BRIDGE: &str = "http://127.0.0.1:9000";

const SCAN_COLOR: Color = Color::from_rgb(1.0, 0.65, 0.0);
const NEAREST_COLOR: Color = Color::from_rgb(0.2, 0.8, 0.2);
const FARTHEST_COLOR: Color = Color::from_rgb(0.9, 0.2, 0.2);
const APPROACH_COLOR: Color = Color::from_rgb(0.3, 0.55, 1.0);

fn main() -> iced::Result {
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Visualizer) -> String {
    "Lidar Approach Tracker".into()
}

fn application_subscription(_: &Visualizer) -> Subscription<Message> {
    time::every(Duration::from_millis(250)).map(|_| Message::Tick)
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

fn bridge_url() -> String {
    std::env::var("LIDAR_BRIDGE_URL").unwrap_or_else(|_| DEFAULT_BRIDGE.into())
}

#[derive(Debug)]
struct Visualizer {
    scene: Option<ScenePayload>,
    status: String,
    history: Vec<String>,
    last_revolution: usize,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    SceneFetched(Result<ScenePayload, String>),
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        (
            Visualizer {
                scene: None,
                status: "Waiting for scans...".into(),
                history: Vec::new(),
                last_revolution: 0,
            },
            Task::perform(fetch_scene(), Message::SceneFetched),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => Task::perform(fetch_scene(), Message::SceneFetched),
            Message::SceneFetched(Ok(scene)) => {
                state.status = format!(
                    "Revolution {}: {} points, {} approaching",
                    scene.revolution,
                    scene.points.len(),
                    scene.approaching.len()
                );
                if scene.revolution != state.last_revolution {
                    if let Some(alert) = &scene.alert {
                        state.push_history(format!("#{}: {}", scene.revolution, alert));
                    }
                    state.last_revolution = scene.revolution;
                }
                state.scene = Some(scene);
                Task::none()
            }
            Message::SceneFetched(Err(err)) => {
                state.status = format!("Bridge error: {err}");
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let plot = Canvas::new(ScanPlot {
            scene: state.scene.clone().unwrap_or_default(),
        })
        .width(Length::Fill)
        .height(Length::Fill);

        let extrema = match &state.scene {
            Some(scene) => column![
                text(
                    scene
                        .nearest
                        .as_ref()
                        .map(|m| m.label.clone())
                        .unwrap_or_else(|| "Nearest: n/a".into())
                )
                .size(16)
                .color(NEAREST_COLOR),
                text(
                    scene
                        .farthest
                        .as_ref()
                        .map(|m| m.label.clone())
                        .unwrap_or_else(|| "Farthest: n/a".into())
                )
                .size(16)
                .color(FARTHEST_COLOR),
                text(
                    scene
                        .sensor_rpm
                        .map(|rpm| format!("Sensor: {:.1} rpm", rpm))
                        .unwrap_or_else(|| "Sensor: n/a".into())
                )
                .size(14),
            ]
            .spacing(4),
            None => column![text("No scan yet").size(16)],
        };

        let approaching = state
            .scene
            .as_ref()
            .map(|scene| scene.approaching.clone())
            .unwrap_or_default();
        let approaching_list = if approaching.is_empty() {
            Column::new().push(text("Nothing approaching").size(12))
        } else {
            approaching
                .iter()
                .fold(Column::new().spacing(4), |col, marker| {
                    col.push(
                        text(format!(
                            "{} deg | {:.1} cm | {:.2} cm/s",
                            marker.angle, marker.distance_cm, marker.speed_cm_s
                        ))
                        .size(12)
                        .color(APPROACH_COLOR),
                    )
                })
        };

        let metrics = state
            .scene
            .as_ref()
            .map(|scene| scene.metrics)
            .unwrap_or_default();
        let tracked_now = state
            .scene
            .as_ref()
            .map(|scene| scene.approaching.len())
            .unwrap_or_default();
        let metrics_column = metrics_lines(&metrics, tracked_now)
            .into_iter()
            .fold(Column::new().spacing(2), |col, line| {
                col.push(text(line).size(12))
            });

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No alerts yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let side_column = column![
            text("Scan").size(26),
            text(&state.status).size(14),
            extrema,
            text("Approaching objects").size(16),
            Container::new(approaching_list).padding(6),
            text("Pipeline").size(16),
            Container::new(metrics_column).padding(6),
            text("Alert log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(160.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(320.0));

        let layout = row![plot, side_column]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

/// Side-panel counters. `tracked_now` is the size of the current table;
/// the created/expired counters are cumulative.
fn metrics_lines(metrics: &PipelineMetrics, tracked_now: usize) -> Vec<String> {
    vec![
        format!("Frames decoded: {}", metrics.frames_decoded),
        format!("Frames rejected: {}", metrics.frames_rejected),
        format!("Samples dropped: {}", metrics.samples_dropped),
        format!("Objects tracked now: {}", tracked_now),
        format!("Objects created: {}", metrics.objects_created),
        format!("Objects expired: {}", metrics.objects_expired),
    ]
}

async fn fetch_scene() -> Result<ScenePayload, String> {
    let response = reqwest::get(format!("{}/scan", bridge_url()))
        .await
        .map_err(|e| e.to_string())?;
    response
        .json::<ScenePayload>()
        .await
        .map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct PlotPoint {
    x_cm: f32,
    y_cm: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct LabeledMarker {
    point: PlotPoint,
    label: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApproachMarker {
    angle: u16,
    point: PlotPoint,
    distance_cm: f32,
    speed_cm_s: f32,
    label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ScenePayload {
    revolution: usize,
    points: Vec<PlotPoint>,
    nearest: Option<LabeledMarker>,
    farthest: Option<LabeledMarker>,
    approaching: Vec<ApproachMarker>,
    alert: Option<String>,
    limit_cm: f32,
    sensor_rpm: Option<f64>,
    metrics: PipelineMetrics,
}

impl Default for ScenePayload {
    fn default() -> Self {
        Self {
            revolution: 0,
            points: Vec::new(),
            nearest: None,
            farthest: None,
            approaching: Vec::new(),
            alert: None,
            limit_cm: 500.0,
            sensor_rpm: None,
            metrics: PipelineMetrics::default(),
        }
    }
}

/// Top-down scatter of one revolution, sensor at the centre.
#[derive(Clone)]
struct ScanPlot {
    scene: ScenePayload,
}

impl ScanPlot {
    fn project(&self, bounds: Rectangle, point: PlotPoint) -> Option<Point> {
        let limit = self.scene.limit_cm.max(1.0);
        if point.x_cm.abs() > limit || point.y_cm.abs() > limit {
            return None;
        }
        let scale = (bounds.width.min(bounds.height) / 2.0 - 12.0) / limit;
        Some(Point::new(
            bounds.width / 2.0 + point.x_cm * scale,
            bounds.height / 2.0 - point.y_cm * scale,
        ))
    }

    fn label(frame: &mut Frame, at: Point, content: &str, color: Color) {
        frame.fill_text(Text {
            content: content.to_string(),
            position: Point::new(at.x + 6.0, at.y - 6.0),
            color,
            size: Pixels(12.0),
            ..Text::default()
        });
    }
}

impl canvas::Program<Message> for ScanPlot {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.02, 0.02, 0.04),
        );

        let center = Point::new(bounds.width / 2.0, bounds.height / 2.0);
        let radius = bounds.width.min(bounds.height) / 2.0 - 12.0;

        for ring in 1..=5 {
            let ring_radius = radius * (ring as f32 / 5.0);
            let ring_path = Path::new(|builder| builder.circle(center, ring_radius));
            frame.stroke(
                &ring_path,
                Stroke::default().with_color(Color::from_rgb(0.2, 0.2, 0.25)),
            );
        }

        let axes = Path::new(|builder| {
            builder.move_to(Point::new(center.x - radius, center.y));
            builder.line_to(Point::new(center.x + radius, center.y));
            builder.move_to(Point::new(center.x, center.y - radius));
            builder.line_to(Point::new(center.x, center.y + radius));
        });
        frame.stroke(
            &axes,
            Stroke::default()
                .with_color(Color::from_rgb(0.35, 0.35, 0.45))
                .with_width(1.0),
        );

        for point in &self.scene.points {
            if let Some(at) = self.project(bounds, *point) {
                let dot = Path::new(|builder| builder.circle(at, 1.5));
                frame.fill(&dot, SCAN_COLOR);
            }
        }

        let sensor = Path::new(|builder| builder.circle(center, 6.0));
        frame.fill(&sensor, Color::from_rgb(0.2, 0.4, 1.0));
        Self::label(&mut frame, center, "LIDAR", Color::from_rgb(0.2, 0.4, 1.0));

        for (marker, color) in [
            (&self.scene.nearest, NEAREST_COLOR),
            (&self.scene.farthest, FARTHEST_COLOR),
        ] {
            if let Some(marker) = marker {
                if let Some(at) = self.project(bounds, marker.point) {
                    let dot = Path::new(|builder| builder.circle(at, 4.5));
                    frame.fill(&dot, color);
                    Self::label(&mut frame, at, &marker.label, color);
                }
            }
        }

        for marker in &self.scene.approaching {
            if let Some(at) = self.project(bounds, marker.point) {
                let triangle = Path::new(|builder| {
                    builder.move_to(Point::new(at.x, at.y - 7.0));
                    builder.line_to(Point::new(at.x - 6.0, at.y + 5.0));
                    builder.line_to(Point::new(at.x + 6.0, at.y + 5.0));
                    builder.close();
                });
                frame.fill(&triangle, APPROACH_COLOR);
                Self::label(&mut frame, at, &marker.label, APPROACH_COLOR);
            }
        }

        if let Some(alert) = &self.scene.alert {
            frame.fill_text(Text {
                content: alert.clone(),
                position: Point::new(12.0, 12.0),
                color: APPROACH_COLOR,
                size: Pixels(16.0),
                ..Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}
