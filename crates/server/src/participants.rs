//! Participant directory endpoints.

use api_types::participant::{ParticipantNew, ParticipantView, ParticipantsResponse};
use axum::{Json, extract::State};

use crate::{ServerError, server::ServerState};

fn map_participant(participant: engine::Participant) -> ParticipantView {
    ParticipantView {
        id: participant.id,
        display_name: participant.display_name,
        image_url: participant.image_url,
    }
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ParticipantNew>,
) -> Result<Json<ParticipantView>, ServerError> {
    let participant = state
        .engine
        .new_participant(&payload.display_name, payload.image_url)
        .await?;
    Ok(Json(map_participant(participant)))
}

pub async fn list(
    State(state): State<ServerState>,
) -> Result<Json<ParticipantsResponse>, ServerError> {
    let participants = state.engine.list_participants().await?;
    Ok(Json(ParticipantsResponse {
        participants: participants.into_iter().map(map_participant).collect(),
    }))
}
