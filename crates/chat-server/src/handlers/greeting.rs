use actix_web::{HttpResponse, Responder};
use serde::Serialize;

pub const GREETING_PATH: &str = "/api/adaitsdawdocker";
pub const GREETING_MESSAGE: &str = "¡Hola desde la API!";

#[derive(Serialize)]
struct GreetingResponse {
    message: &'static str,
}

/// Same body for every request; reads no request data and no state.
pub async fn handler() -> impl Responder {
    HttpResponse::Ok().json(GreetingResponse {
        message: GREETING_MESSAGE,
    })
}
