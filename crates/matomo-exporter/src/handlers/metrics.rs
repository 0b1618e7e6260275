use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Current registry snapshot in the Prometheus text format.
pub async fn handler(state: web::Data<AppState>) -> impl Responder {
    match state.registry.encode() {
        Ok(body) => HttpResponse::Ok().content_type(CONTENT_TYPE).body(body),
        Err(error) => {
            log::error!("Failed to encode metrics: {}", error);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": error.to_string(),
            }))
        }
    }
}
