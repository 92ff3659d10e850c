//! JSON API
//!
//! - `POST /api/calc` runs a `Job` and answers with its `Report`
//!   (422 with `{ "error", "detail" }` when the inputs cannot be resolved)
//! - `GET /api/last/{operation}` echoes the last job posted for that operation
//! - `DELETE /api/session` drops everything remembered for the session
//! - `GET /api/presets` returns the preset library
//!
//! Callers are told apart by the `x-session-id` header.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::calculator::{Calculator, Job, OperationKind};
use crate::presets::PresetLibrary;
use crate::session::{EchoCache, ANONYMOUS};
use crate::units::UnitSystem;

pub struct AppState {
    presets: PresetLibrary,
    units: UnitSystem,
    sessions: RwLock<EchoCache>,
}

impl AppState {
    pub fn new(presets: PresetLibrary, units: UnitSystem) -> Arc<Self> {
        Arc::new(Self {
            presets,
            units,
            sessions: RwLock::new(EchoCache::new()),
        })
    }
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) {
    info!(%addr, units = %state.units, "chipload API listening");
    warp::serve(routes(state)).run(addr).await;
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let calc = warp::path!("api" / "calc")
        .and(warp::post())
        .and(session())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handle_calc);

    let last = warp::path!("api" / "last" / String)
        .and(warp::get())
        .and(session())
        .and(with_state(state.clone()))
        .and_then(handle_last);

    let forget = warp::path!("api" / "session")
        .and(warp::delete())
        .and(session())
        .and(with_state(state.clone()))
        .and_then(handle_forget);

    let presets = warp::path!("api" / "presets")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_presets);

    calc.or(last).or(forget).or(presets)
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn session() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-session-id").map(|id: Option<String>| {
        id.filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string())
    })
}

async fn handle_calc(
    session: String,
    mut job: Job,
    state: Arc<AppState>,
) -> Result<impl Reply, Infallible> {
    let mut sessions = state.sessions.write().await;
    // An explicit load is remembered for the machine, a missing one is recalled
    if let Some(machine) = job.setup.machine.clone() {
        match job.setup.max_load_pct {
            Some(pct) => {
                job.setup.max_load_pct = Some(sessions.set_max_load(&session, &machine, pct));
            }
            None => job.setup.max_load_pct = sessions.max_load(&session, &machine),
        }
    }

    debug!(session = %session, operation = %job.kind(), "calc request");
    let calc = Calculator::new(&state.presets, state.units);
    Ok(match calc.run(&job) {
        Ok(report) => {
            // Only inputs that calculated are echoed back
            sessions.remember(&session, &job);
            warp::reply::with_status(warp::reply::json(&report), StatusCode::OK)
        }
        Err(e) => warp::reply::with_status(
            warp::reply::json(&json!({ "error": e.to_string(), "detail": e })),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
    })
}

async fn handle_last(
    operation: String,
    session: String,
    state: Arc<AppState>,
) -> Result<impl Reply, Infallible> {
    let kind: OperationKind = match operation.parse() {
        Ok(kind) => kind,
        Err(e) => {
            return Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "error": e })),
                StatusCode::NOT_FOUND,
            ))
        }
    };

    let sessions = state.sessions.read().await;
    Ok(match sessions.last(&session, kind) {
        Some(job) => warp::reply::with_status(warp::reply::json(job), StatusCode::OK),
        None => warp::reply::with_status(
            warp::reply::json(&json!({ "error": format!("no previous {} input", kind) })),
            StatusCode::NOT_FOUND,
        ),
    })
}

async fn handle_forget(session: String, state: Arc<AppState>) -> Result<impl Reply, Infallible> {
    let forgotten = state.sessions.write().await.forget(&session);
    debug!(session = %session, forgotten, "session dropped");
    Ok(warp::reply::json(&json!({ "session": session, "forgotten": forgotten })))
}

async fn handle_presets(state: Arc<AppState>) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.presets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn state() -> Arc<AppState> {
        AppState::new(PresetLibrary::builtin().unwrap(), UnitSystem::Imperial)
    }

    fn body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_calc_returns_report() {
        let api = routes(state());
        let res = warp::test::request()
            .method("POST")
            .path("/api/calc")
            .json(&json!({
                "operation": "turning",
                "diameter": 1.0,
                "cutting_speed": 300,
                "feed_per_rev": 0.010
            }))
            .reply(&api)
            .await;

        assert_eq!(res.status(), 200);
        let report = body(res.body());
        assert_eq!(report["operation"], "turning");
        let rpm = report["params"]["rpm"].as_f64().unwrap();
        assert!((rpm - 1145.916).abs() < 0.01);
        assert_eq!(report["params"]["feed"]["mode"], "per_rev");
    }

    #[tokio::test]
    async fn test_calc_error_is_422() {
        let api = routes(state());
        let res = warp::test::request()
            .method("POST")
            .path("/api/calc")
            .json(&json!({ "operation": "drilling", "diameter": 0.5, "feed_per_rev": 0.004 }))
            .reply(&api)
            .await;

        assert_eq!(res.status(), 422);
        let err = body(res.body());
        assert_eq!(err["error"], "Enter either cutting speed or RPM.");
        assert_eq!(err["detail"]["kind"], "missing_input");
    }

    #[tokio::test]
    async fn test_last_input_is_per_session() {
        let api = routes(state());
        let job = json!({ "operation": "milling", "diameter": 0.5, "rpm": 8000, "flutes": 4, "chip_load": 0.002 });
        let res = warp::test::request()
            .method("POST")
            .path("/api/calc")
            .header("x-session-id", "alice")
            .json(&job)
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);

        let res = warp::test::request()
            .path("/api/last/milling")
            .header("x-session-id", "alice")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);
        assert_eq!(body(res.body())["chip_load"], 0.002);

        let res = warp::test::request()
            .path("/api/last/milling")
            .header("x-session-id", "bob")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 404);

        let res = warp::test::request().path("/api/last/knurling").reply(&api).await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn test_failed_input_is_not_echoed() {
        let api = routes(state());
        let res = warp::test::request()
            .method("POST")
            .path("/api/calc")
            .json(&json!({ "operation": "turning", "diameter": 1.0, "feed_per_rev": 0.010 }))
            .reply(&api)
            .await;
        assert_eq!(res.status(), 422);

        let res = warp::test::request().path("/api/last/turning").reply(&api).await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn test_delete_session_forgets_inputs() {
        let api = routes(state());
        let res = warp::test::request()
            .method("POST")
            .path("/api/calc")
            .header("x-session-id", "carol")
            .json(&json!({ "operation": "drilling", "diameter": 0.5, "rpm": 500, "feed_per_min": 2 }))
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);

        let res = warp::test::request()
            .method("DELETE")
            .path("/api/session")
            .header("x-session-id", "carol")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);
        assert_eq!(body(res.body())["forgotten"], true);

        let res = warp::test::request()
            .path("/api/last/drilling")
            .header("x-session-id", "carol")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 404);

        let res = warp::test::request()
            .method("DELETE")
            .path("/api/session")
            .header("x-session-id", "carol")
            .reply(&api)
            .await;
        assert_eq!(body(res.body())["forgotten"], false);
    }

    #[tokio::test]
    async fn test_max_load_is_recalled_per_machine() {
        let api = routes(state());
        let drill = |load: Option<u8>| {
            let mut setup = json!({ "machine": "Tormach 1100MX" });
            if let Some(load) = load {
                setup["max_load_pct"] = json!(load);
            }
            json!({
                "operation": "drilling", "diameter": 0.5, "rpm": 500, "feed_per_min": 2,
                "material": "4140", "setup": setup
            })
        };

        for (load, expected) in [(Some(40), 40), (None, 40)] {
            let res = warp::test::request()
                .method("POST")
                .path("/api/calc")
                .header("x-session-id", "shop")
                .json(&drill(load))
                .reply(&api)
                .await;
            assert_eq!(res.status(), 200);
            assert_eq!(body(res.body())["power"]["max_load_pct"], expected);
        }
    }

    #[tokio::test]
    async fn test_presets_listed() {
        let api = routes(state());
        let res = warp::test::request().path("/api/presets").reply(&api).await;
        assert_eq!(res.status(), 200);
        let presets = body(res.body());
        assert!(presets["machines"]["Haas VF-2"].is_object());
        assert_eq!(presets["inserts"]["CNMG (Rough)"]["feed_per_rev"], json!([0.01, 0.02]));
    }
}
