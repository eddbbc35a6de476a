use crate::gui_bridge::model::ScanScene;
use lidarcore::{RevolutionReport, RevolutionSink};
use log::{error, info, warn};
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{Filter, Rejection, Reply};

type SharedScene = Arc<RwLock<ScanScene>>;

fn current_scene(state: &SharedScene) -> ScanScene {
    state
        .read()
        .map(|guard| guard.clone())
        .unwrap_or_default()
}

fn routes(state: SharedScene) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let scan_route = warp::path("scan")
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: SharedScene| warp::reply::json(&current_scene(&state)));

    let metrics_route = warp::path("metrics")
        .and(warp::get())
        .and(state_filter)
        .map(|state: SharedScene| warp::reply::json(&current_scene(&state).metrics));

    scan_route.or(metrics_route)
}

/// Hosts the latest scene over HTTP for the visualizer.
pub struct ScanBridge {
    state: SharedScene,
    bind: SocketAddr,
}

impl ScanBridge {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            state: Arc::new(RwLock::new(ScanScene::default())),
            bind,
        }
    }

    /// Starts the HTTP endpoint on its own thread and runtime.
    pub fn serve(&self) {
        let routes = routes(self.state.clone());
        let bind = self.bind;
        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build bridge runtime: {}", err);
                    return;
                }
            };
            runtime.block_on(async move {
                warp::serve(routes).run(bind).await;
            });
        });
        info!("scan bridge listening on http://{}/scan", self.bind);
    }

    /// Presentation adapter feeding this bridge.
    pub fn sink(&self) -> SceneSink {
        SceneSink {
            state: self.state.clone(),
            alerting: false,
        }
    }

    pub fn publish_status(&self, message: &str) {
        println!("[scan] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> ScanScene {
        current_scene(&self.state)
    }
}

/// Turns each revolution into a [`ScanScene`] and publishes it.
pub struct SceneSink {
    state: SharedScene,
    alerting: bool,
}

impl RevolutionSink for SceneSink {
    fn on_revolution(&mut self, report: &RevolutionReport) {
        let scene = ScanScene::from_report(report);

        match (&scene.alert, self.alerting) {
            (Some(alert), false) => warn!("{}", alert),
            (None, true) => info!("approach alert cleared"),
            _ => {}
        }
        self.alerting = scene.alert.is_some();

        if let Ok(mut guard) = self.state.write() {
            *guard = scene;
        }
    }
}
