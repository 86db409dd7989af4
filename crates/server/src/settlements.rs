//! Settlement endpoint.

use api_types::settlement::{FailedTransferView, SettleRequest, SettleResponse, TransferView};
use axum::{Json, extract::State};
use engine::{SettleScope, SettlementTransfer};

use crate::{ServerError, server::ServerState, transactions::map_transaction};

fn map_transfer(transfer: &SettlementTransfer) -> TransferView {
    TransferView {
        payer_id: transfer.payer_id,
        receiver_id: transfer.receiver_id,
        amount_minor: transfer.amount.cents(),
        expense_id: transfer.expense_id,
        group_id: transfer.group_id.clone(),
    }
}

fn scope_from(payload: &SettleRequest) -> Result<SettleScope, ServerError> {
    match (payload.a, payload.b, &payload.group_id) {
        (Some(a), Some(b), None) => {
            if a == b {
                return Err(ServerError::Generic(
                    "a and b must differ".to_string(),
                ));
            }
            Ok(SettleScope::Direct { a, b })
        }
        (None, None, Some(group_id)) => Ok(SettleScope::Group(group_id.clone())),
        _ => Err(ServerError::Generic(
            "provide either a and b, or group_id".to_string(),
        )),
    }
}

pub async fn settle(
    State(state): State<ServerState>,
    Json(payload): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, ServerError> {
    let scope = scope_from(&payload)?;

    if payload.preview {
        let planned = state.engine.settlement_preview(scope).await?;
        return Ok(Json(SettleResponse {
            applied: Vec::new(),
            failed: Vec::new(),
            planned: planned.iter().map(map_transfer).collect(),
        }));
    }

    let report = state.engine.settle(scope).await?;
    for failure in &report.failed {
        tracing::error!(
            "settlement transfer {} -> {} over {} failed: {}",
            failure.transfer.payer_id,
            failure.transfer.receiver_id,
            failure.transfer.amount,
            failure.reason
        );
    }

    Ok(Json(SettleResponse {
        applied: report
            .applied
            .iter()
            .map(map_transaction)
            .collect::<Result<_, _>>()?,
        failed: report
            .failed
            .iter()
            .map(|failure| FailedTransferView {
                transfer: map_transfer(&failure.transfer),
                reason: failure.reason.clone(),
            })
            .collect(),
        planned: Vec::new(),
    }))
}
