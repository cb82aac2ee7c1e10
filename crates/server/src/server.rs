use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::sync::Arc;

use crate::{campaigns, contributions, movements};
use engine::Ledger;

static ACCOUNT_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("account-id");

#[derive(Clone)]
pub struct ServerState {
    pub ledger: Arc<Ledger>,
}

/// The caller identity attached to every authenticated request.
///
/// Identities are established by the external signing layer; the ledger
/// trusts the value it is given.
#[derive(Clone, Debug)]
pub struct Account(pub String);

/// `TypedHeader` for the caller identity header.
///
/// Requests must contain an "account-id" entry in the header.
#[derive(Debug)]
struct AccountHeader(String);

impl Header for AccountHeader {
    fn name() -> &'static axum::http::HeaderName {
        &ACCOUNT_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(AccountHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode account-id header"),
        }
    }
}

async fn auth(
    account_header: Option<TypedHeader<AccountHeader>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(AccountHeader(account))) = account_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(Account(account));
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/campaigns", post(campaigns::create).get(campaigns::list))
        .route("/campaigns/{id}", get(campaigns::detail))
        .route("/campaigns/{id}/finalize", post(campaigns::finalize))
        .route("/campaigns/{id}/withdraw", post(campaigns::withdraw))
        .route("/campaigns/{id}/refund", post(contributions::refund))
        .route(
            "/campaigns/{id}/contributions",
            post(contributions::contribute),
        )
        .route(
            "/campaigns/{id}/contributions/{account}",
            get(contributions::get),
        )
        .route("/campaigns/{id}/movements", get(movements::list))
        .route_layer(middleware::from_fn(auth))
        .with_state(state)
}

pub async fn run(ledger: Ledger) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(ledger, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    ledger: Ledger,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        ledger: Arc::new(ledger),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    ledger: Ledger,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(ledger, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use migration::MigratorTrait;
    use tower::ServiceExt;

    async fn app() -> Router {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let ledger = Ledger::builder().database(db).build().await.unwrap();
        router(ServerState {
            ledger: Arc::new(ledger),
        })
    }

    fn get_as(uri: &str, account: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("GET")
            .uri(uri)
            .header("account-id", account)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, account: &str, body: Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("account-id", account)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_campaign(app: &Router, owner: &str, goal_minor: u64) -> String {
        let response = app
            .clone()
            .oneshot(post_json(
                "/campaigns",
                owner,
                json!({
                    "name": "Solar roof",
                    "description": "Panels for the community hall",
                    "goal_minor": goal_minor,
                    "duration_days": 7,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn missing_account_header_is_unauthorized() {
        let app = app().await;
        let request = axum::http::Request::builder()
            .method("GET")
            .uri("/campaigns")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_list_roundtrip() {
        let app = app().await;
        let id = create_campaign(&app, "alice", 1000).await;

        let response = app.oneshot(get_as("/campaigns", "alice")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = json_body(response).await;
        assert_eq!(listed["campaigns"].as_array().unwrap().len(), 1);
        assert_eq!(listed["campaigns"][0]["id"].as_str().unwrap(), id);
        assert_eq!(listed["campaigns"][0]["owner"].as_str().unwrap(), "alice");
    }

    #[tokio::test]
    async fn list_for_owner_without_campaigns_is_empty() {
        let app = app().await;

        let response = app.oneshot(get_as("/campaigns", "nobody")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = json_body(response).await;
        assert!(listed["campaigns"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_campaign_is_not_found() {
        let app = app().await;
        let uri = format!("/campaigns/{}", uuid::Uuid::new_v4());

        let response = app.oneshot(get_as(&uri, "alice")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn contribute_and_read_back() {
        let app = app().await;
        let id = create_campaign(&app, "alice", 1000).await;

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/campaigns/{id}/contributions"),
                "bob",
                json!({ "amount_minor": 400 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let recorded = json_body(response).await;
        assert_eq!(recorded["raised_minor"].as_u64().unwrap(), 400);

        let response = app
            .clone()
            .oneshot(get_as(
                &format!("/campaigns/{id}/contributions/bob"),
                "alice",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["amount_minor"].as_u64().unwrap(), 400);

        let response = app
            .oneshot(get_as(&format!("/campaigns/{id}"), "alice"))
            .await
            .unwrap();
        let detail = json_body(response).await;
        assert_eq!(detail["raised_minor"].as_u64().unwrap(), 400);
        assert_eq!(detail["status"].as_str().unwrap(), "active");
    }

    #[tokio::test]
    async fn zero_pledge_is_unprocessable() {
        let app = app().await;
        let id = create_campaign(&app, "alice", 1000).await;

        let response = app
            .oneshot(post_json(
                &format!("/campaigns/{id}/contributions"),
                "bob",
                json!({ "amount_minor": 0 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn early_finalize_is_a_conflict() {
        let app = app().await;
        let id = create_campaign(&app, "alice", 1000).await;

        let response = app
            .oneshot(post_json(
                &format!("/campaigns/{id}/finalize"),
                "anyone",
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn movements_list_records_pledges() {
        let app = app().await;
        let id = create_campaign(&app, "alice", 1000).await;

        for amount in [400u64, 700] {
            let response = app
                .clone()
                .oneshot(post_json(
                    &format!("/campaigns/{id}/contributions"),
                    "bob",
                    json!({ "amount_minor": amount }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(get_as(&format!("/campaigns/{id}/movements"), "alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = json_body(response).await;
        let movements = listed["movements"].as_array().unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements.iter().all(|m| m["kind"] == "pledge"));
        assert!(
            movements
                .iter()
                .any(|m| m["raised_after_minor"].as_u64() == Some(1100))
        );
    }
}
