//! Key management endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use ledger::Ballot;

use super::reply;
use crate::state::SharedState;

/// Keypair payload returned by every key endpoint.
#[derive(Serialize)]
pub struct KeyPairResponse {
    pub public_key: String,
    pub private_key: String,
}

/// `POST /generateKeys`
///
/// Mints a fresh voter keypair without touching the node's own ballot.
pub async fn generate_keys() -> Response {
    match Ballot::generate_keys() {
        Ok((private_key, public_key)) => (
            StatusCode::CREATED,
            Json(KeyPairResponse {
                public_key,
                private_key,
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "generating keys failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Generating keys failed.")
        }
    }
}

/// `POST /ballot`
///
/// Creates the node's own keypair and persists it to the ballot file.
pub async fn create_keys(State(state): State<SharedState>) -> Response {
    let mut ballot = state.ballot.lock().await;
    if let Err(err) = ballot.create_keys() {
        tracing::error!(error = %err, "creating node keys failed");
        return reply(StatusCode::INTERNAL_SERVER_ERROR, "Saving the keys failed.");
    }
    if let Err(err) = ballot.save_keys() {
        tracing::error!(error = %err, "saving node keys failed");
        return reply(StatusCode::INTERNAL_SERVER_ERROR, "Saving the keys failed.");
    }
    keypair_response(&ballot)
}

/// `GET /ballot`
///
/// Loads the node's keypair from the ballot file into memory.
pub async fn load_keys(State(state): State<SharedState>) -> Response {
    let mut ballot = state.ballot.lock().await;
    match ballot.load_keys() {
        Ok(()) => keypair_response(&ballot),
        Err(err) => {
            tracing::warn!(error = %err, "loading node keys failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Loading the keys failed.")
        }
    }
}

fn keypair_response(ballot: &Ballot) -> Response {
    match (&ballot.public_key, &ballot.private_key) {
        (Some(public_key), Some(private_key)) => (
            StatusCode::CREATED,
            Json(KeyPairResponse {
                public_key: public_key.clone(),
                private_key: private_key.clone(),
            }),
        )
            .into_response(),
        _ => reply(StatusCode::INTERNAL_SERVER_ERROR, "Loading the keys failed."),
    }
}
