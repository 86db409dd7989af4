//! Balance read endpoints.

use api_types::balance::{BalanceEntryView, BalancesResponse, PairBalanceResponse};
use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

/// All balance views held for one participant: the direct row and one row
/// per group, never merged.
pub async fn for_participant(
    State(state): State<ServerState>,
    Path(participant_id): Path<Uuid>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let entries = state.engine.balances_for(participant_id).await?;
    Ok(Json(BalancesResponse {
        participant_id,
        entries: entries
            .into_iter()
            .map(|entry| BalanceEntryView {
                counterparty_id: entry.counterparty_id,
                group_id: entry.group_id,
                net_minor: entry.net.cents(),
            })
            .collect(),
    }))
}

/// Direct-scope pair balance.
pub async fn between(
    State(state): State<ServerState>,
    Path((a, b)): Path<(Uuid, Uuid)>,
) -> Result<Json<PairBalanceResponse>, ServerError> {
    let net = state.engine.balance_between(a, b, None).await?;
    Ok(Json(PairBalanceResponse {
        a,
        b,
        net_minor: net.cents(),
    }))
}
