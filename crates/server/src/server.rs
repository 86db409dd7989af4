use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{balances, expenses, participants, settlements, transactions};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/participants",
            get(participants::list).post(participants::create),
        )
        .route("/expenses", post(expenses::create))
        .route(
            "/expenses/{id}",
            get(expenses::get)
                .patch(expenses::update)
                .delete(expenses::delete),
        )
        .route("/directPayment", post(transactions::direct_payment_new))
        .route("/transactions", get(transactions::list))
        .route("/transactions/grouped", get(transactions::grouped))
        .route("/balances/{participant_id}", get(balances::for_participant))
        .route("/balances/{a}/{b}", get(balances::between))
        .route("/settle", post(settlements::settle))
        .with_state(state)
}

pub async fn run(engine: Engine) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    async fn test_router() -> Router {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        router(ServerState {
            engine: Arc::new(engine),
        })
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn expense_flow_over_http() {
        let router = test_router().await;

        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let response = router
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/participants",
                    json!({"display_name": name, "image_url": null}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            ids.push(body["id"].as_str().unwrap().to_string());
        }
        let (alice, bob) = (ids[0].clone(), ids[1].clone());

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/expenses",
                json!({
                    "description": "Dinner",
                    "amount_minor": 3000,
                    "occurred_at": "2026-08-01T20:00:00+00:00",
                    "category": null,
                    "created_by": alice,
                    "group_id": null,
                    "payers": [{"participant_id": alice, "amount_minor": 3000}],
                    "splitters": [alice, bob],
                    "strategy": "equal",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved = json_body(response).await;
        assert_eq!(saved["expense"]["splitters"][0]["amount_minor"], 1500);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/balances/{alice}/{bob}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let balance = json_body(response).await;
        assert_eq!(balance["net_minor"], 1500);

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/settle",
                json!({"a": alice, "b": bob, "group_id": null}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let settled = json_body(response).await;
        assert_eq!(settled["applied"].as_array().unwrap().len(), 1);
        assert_eq!(settled["failed"].as_array().unwrap().len(), 0);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/balances/{alice}/{bob}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let balance = json_body(response).await;
        assert_eq!(balance["net_minor"], 0);
    }

    #[tokio::test]
    async fn invalid_split_maps_to_422() {
        let router = test_router().await;

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/participants",
                json!({"display_name": "alice", "image_url": null}),
            ))
            .await
            .unwrap();
        let alice = json_body(response).await["id"].as_str().unwrap().to_string();

        let response = router
            .oneshot(json_request(
                "POST",
                "/expenses",
                json!({
                    "description": "Broken",
                    "amount_minor": 1000,
                    "occurred_at": "2026-08-01T20:00:00+00:00",
                    "category": null,
                    "created_by": alice,
                    "group_id": null,
                    "payers": [{"participant_id": alice, "amount_minor": 1000}],
                    "splitters": [],
                    "strategy": "equal",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
