use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::{codes, err};

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::staff::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::subjects::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::papers::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        codes::NOT_IMPLEMENTED,
        format!("unknown method: {}", req.method),
        None,
    )
}
