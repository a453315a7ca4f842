//! Service entry point.
//!
//! Run with:
//!   RUST_LOG=debug cargo run
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl -X PUT http://localhost:3000/items/42?q=abc \
//!        -H 'content-type: application/json' \
//!        -d '{"item":{"name":"hammer","price":9.5},
//!             "user":{"username":"alice"},"importance":3}'
//!   curl http://localhost:3000/unicorns/yolo

use vane::{app, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    Server::bind("0.0.0.0:3000")
        .serve(app::router())
        .await
        .expect("server error");
}
