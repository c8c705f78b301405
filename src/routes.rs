use log::warn;
use std::sync::Arc;

use actix_web::{
    HttpRequest, HttpResponse, Responder, guard, http::Method, http::header::ContentType, web,
};

use crate::command::{ActionKind, Command, TriggerQuery};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::executor::ActionExecutor;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub executor: Arc<ActionExecutor>,
}

pub fn api_scope(base_path: &str) -> actix_web::Scope {
    web::scope(base_path)
        .service(
            web::resource("/status")
                .route(web::get().to(status))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::GET]))
                        .to(method_not_allowed),
                ),
        )
        .service(
            web::resource(["/trigger", "/control"])
                .route(web::get().to(trigger))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::GET]))
                        .to(method_not_allowed),
                ),
        )
        .service(
            web::resource("/toggle")
                .route(web::get().to(toggle))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::GET]))
                        .to(method_not_allowed),
                ),
        )
}

async fn status() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("ok")
}

async fn trigger(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    run_command(&req, &state, ActionKind::Timer).await
}

async fn toggle(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    run_command(&req, &state, ActionKind::Toggle).await
}

async fn run_command(
    req: &HttpRequest,
    state: &AppState,
    default_action: ActionKind,
) -> Result<HttpResponse, AppError> {
    let query = web::Query::<TriggerQuery>::from_query(req.query_string())
        .map_err(|e| AppError::InvalidQuery(e.to_string()))?
        .into_inner();

    authenticate(&state.config, &query)?;

    let command = Command::from_query(&query, &state.config, default_action)
        .inspect_err(|e| warn!("Rejected command: {e}"))?;
    let outcome = state.executor.execute(command).await?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(outcome))
}

fn authenticate(config: &AppConfig, query: &TriggerQuery) -> Result<(), AppError> {
    match config.password.as_deref() {
        None => Ok(()),
        Some(expected) if query.pass.as_deref() == Some(expected) => Ok(()),
        Some(_) => {
            warn!("Rejected command with a wrong password");
            Err(AppError::Unauthorized)
        }
    }
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}

fn guard_not_methods(methods: &[Method]) -> impl guard::Guard {
    let allowed: Vec<Method> = methods.to_vec();
    guard::fn_guard(move |ctx| !allowed.iter().any(|m| m == ctx.head().method))
}
