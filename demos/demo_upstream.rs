//! Stand-in upstream for trying the proxy by hand.
//!
//! ```text
//! cargo run --example demo_upstream
//! cargo run -- --config demos/masking-proxy.toml
//! curl -s localhost:8080/login -H 'content-type: application/json' \
//!      -H 'authorization: Bearer xyz' -d '{"user":"a","password":"p"}'
//! ```

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = Router::new()
        .route(
            "/login",
            post(|Json(body): Json<Value>| async move {
                let user = body["user"].as_str().unwrap_or("anonymous").to_string();
                Json(json!({ "user": user, "token": { "value": "abc", "ttl": 60 } }))
            }),
        )
        .route("/status", get(|| async { "Backend is healthy" }));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    println!("Demo upstream listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
