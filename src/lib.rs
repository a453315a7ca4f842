//! # vane
//!
//! A small HTTP framework with a declarative request validation layer.
//!
//! ## The contract
//!
//! Routes are declared once, at startup, as data: a method, a path template,
//! and a list of [`ParameterSpec`]s saying where each input comes from, what
//! type it coerces to, and which constraints bound it. The route table
//! validates every input *before* the handler runs — a handler never sees a
//! request that failed its declared constraints, and never parses a raw
//! string it did not ask for.
//!
//! Everything request-shaped is immutable after startup: the route table,
//! the body [`Schema`](schema::Schema)s, and the [`ErrorPolicy`] mapping
//! handler error kinds to responses are built in `main` and handed to the
//! server as one configuration object. No global registries.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vane::{HttpError, ParameterSpec, Request, Response, Route, Router, Server};
//! use vane::schema::FieldType;
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new().route(
//!         Route::get("/users/{id}")
//!             .param(ParameterSpec::path("id", FieldType::Int).ge(0.0)),
//!         get_user,
//!     );
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Result<Response, HttpError> {
//!     let id = req.args().int("id")?;
//!     Ok(Response::json(format!(r#"{{"id":{id}}}"#).into_bytes()))
//! }
//! ```

mod error;
mod handler;
mod method;
mod multipart;
mod param;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod schema;

pub use error::{ConfigError, DomainError, Error, ErrorPolicy, HttpError, ValidationError, Violation};
pub use handler::Handler;
pub use method::Method;
pub use multipart::UploadPart;
pub use param::{ArgValue, Args, ParameterSpec, Source};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use router::{Route, Router};
pub use server::Server;
