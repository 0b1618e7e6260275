use std::sync::Arc;

use actix_web::{test, web, App};
use matomo_api::SiteId;
use matomo_exporter::{routes, AppState};
use matomo_metrics::{CycleStatus, ExporterRegistry, SchedulerState};
use parking_lot::RwLock;

fn state() -> (web::Data<AppState>, Arc<ExporterRegistry>, Arc<RwLock<CycleStatus>>) {
    let registry = Arc::new(ExporterRegistry::new().unwrap());
    let status = Arc::new(RwLock::new(CycleStatus::default()));
    let state = web::Data::new(AppState::new(registry.clone(), status.clone()));
    (state, registry, status)
}

#[actix_web::test]
async fn test_metrics_endpoint_serves_text_format() {
    let (state, registry, _) = state();
    registry.sites.set(3);
    registry.visits.set(&SiteId::from(1), &["Blog", "day"], 12.0);

    let app = test::init_service(App::new().app_data(state).configure(routes)).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/plain; version=0.0.4; charset=utf-8"
    );

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains("number_of_sites 3"));
    assert!(text.contains(r#"number_of_visits{period="day",site_name="Blog"} 12"#));
}

#[actix_web::test]
async fn test_root_serves_same_snapshot() {
    let (state, registry, _) = state();
    registry.sites.set(-1);

    let app = test::init_service(App::new().app_data(state).configure(routes)).await;

    let root = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    let metrics =
        test::call_and_read_body(&app, test::TestRequest::get().uri("/metrics").to_request())
            .await;

    assert_eq!(root, metrics);
    assert!(std::str::from_utf8(&root).unwrap().contains("number_of_sites -1"));
}

#[actix_web::test]
async fn test_health_reports_cycle_status() {
    let (state, _, status) = state();
    {
        let mut status = status.write();
        status.state = SchedulerState::Idle;
        status.cycles_completed = 4;
    }

    let app = test::init_service(App::new().app_data(state).configure(routes)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["state"], "idle");
    assert_eq!(body["cycles_completed"], 4);
    assert!(body["last_cycle"].is_null());
}

#[actix_web::test]
async fn test_unknown_path_is_not_found() {
    let (state, _, _) = state();
    let app = test::init_service(App::new().app_data(state).configure(routes)).await;

    let req = test::TestRequest::get().uri("/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}
