//! Vote admission and mempool endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use ledger::{Ballot, Vote};

use super::{field_str, field_u64, json_body, lookup_election, reply};
use crate::state::SharedState;

/// Echo of a client-submitted vote in the `POST /vote` response.
#[derive(Serialize)]
pub struct VoteReceipt {
    pub voter: String,
    pub candidate: String,
    pub signature: String,
    pub election: u64,
}

/// Response body for `POST /vote`.
#[derive(Serialize)]
pub struct AddVoteResponse {
    pub message: &'static str,
    pub vote: VoteReceipt,
    pub funds: i64,
}

/// `POST /vote`
///
/// Signs and admits a vote on behalf of the client, then fans it out to
/// every peer. The vote is admitted and persisted locally *before* the
/// fan-out; a peer that declines still fails the request, leaving the vote
/// in the local mempool for the next resolve cycle to sort out.
pub async fn add_vote(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let (Some(candidate), Some(voter), Some(private_key), Some(election)) = (
        field_str(&values, "candidate"),
        field_str(&values, "voter_public_key"),
        field_str(&values, "voter_private_key"),
        field_u64(&values, "election"),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "Required data is missing.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    if handle.lock().await.has_voted(voter) {
        return reply(StatusCode::BAD_REQUEST, "Voter already Voted.");
    }

    let signature = match Ballot::sign_vote(voter, private_key, candidate, 1) {
        Ok(signature) => signature,
        Err(err) => {
            tracing::warn!(error = %err, "signing a vote failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Creating a vote failed.");
        }
    };

    let peers = {
        let mut guard = handle.lock().await;
        if let Err(err) = guard.add_vote(candidate, voter, &signature, 1) {
            tracing::warn!(election, error = %err, "vote admission failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Creating a vote failed.");
        }
        guard.peer_nodes()
    };

    let vote = Vote::new(voter, candidate, signature.clone(), 1);
    let fanout = state.peers.fan_out_vote(&peers, election, &vote).await;
    if fanout.declined {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, "Creating a vote failed.");
    }

    let funds = handle.lock().await.get_balance(voter);
    (
        StatusCode::CREATED,
        Json(AddVoteResponse {
            message: "Successfully added vote.",
            vote: VoteReceipt {
                voter: voter.to_string(),
                candidate: candidate.to_string(),
                signature,
                election,
            },
            funds,
        }),
    )
        .into_response()
}

/// Response body for `POST /broadcast-vote`.
#[derive(Serialize)]
pub struct BroadcastVoteResponse {
    pub message: &'static str,
    pub vote: Vote,
}

/// `POST /broadcast-vote`
///
/// Gossip ingestion: admits a vote a peer already accepted. No further
/// fan-out happens here, otherwise votes would circulate forever.
pub async fn broadcast_vote(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let (Some(election), Some(voter), Some(candidate), Some(amount), Some(signature)) = (
        field_u64(&values, "election"),
        field_str(&values, "voter"),
        field_str(&values, "candidate"),
        field_u64(&values, "amount"),
        field_str(&values, "signature"),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "Required data are missing.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let mut guard = handle.lock().await;
    match guard.add_vote(candidate, voter, signature, amount) {
        Ok(()) => (
            StatusCode::CREATED,
            Json(BroadcastVoteResponse {
                message: "Successfully added Vote!",
                vote: Vote::new(voter, candidate, signature, amount),
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(election, error = %err, "rejected a broadcast vote");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Creating a vote failed.")
        }
    }
}

/// `POST /votes`
///
/// Returns the election's mempool as a bare JSON array.
pub async fn unverified_votes(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let Some(election) = field_u64(&values, "election") else {
        return reply(StatusCode::BAD_REQUEST, "Election ID is needed!");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let votes = handle.lock().await.mempool().to_vec();
    (StatusCode::OK, Json(votes)).into_response()
}

/// Response body for `POST /vote-eligibility`.
#[derive(Serialize)]
pub struct VoteEligibilityResponse {
    pub message: &'static str,
    #[serde(rename = "isVote")]
    pub is_vote: bool,
}

/// `POST /vote-eligibility`
///
/// Reports whether the voter has already cast a vote (chain or mempool).
pub async fn vote_eligibility(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let (Some(election), Some(voter)) = (
        field_u64(&values, "election"),
        field_str(&values, "voter"),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "Required data are missing.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let is_vote = handle.lock().await.has_voted(voter);
    (
        StatusCode::OK,
        Json(VoteEligibilityResponse {
            message: "Fetched request successfully.",
            is_vote,
        }),
    )
        .into_response()
}
