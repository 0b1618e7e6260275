use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub async fn handler(state: web::Data<AppState>) -> impl Responder {
    let status = state.status.read().clone();
    HttpResponse::Ok().json(status)
}
