//! Thin axum HTTP surface over the Catalog/Manager/Request machinery (spec
//! §6/§9), grounded on `qarax::handlers::mod`'s router assembly.

mod location;
mod operations;
mod record;
mod request;

use axum::{
    body::Body,
    response::{self, IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use http::{header::HeaderName, Request, StatusCode};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::Error;
use crate::Services;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

#[derive(OpenApi)]
#[openapi(
    paths(
        location::list,
        location::add,
        record::get,
        request::create,
        request::list_for_record,
        request::subscribe,
        operations::archive,
        operations::stage,
        operations::clear_hot,
        operations::trigger_process_transfers,
        operations::trigger_process_requests,
    ),
    components(schemas(
        crate::model::locations::Location,
        crate::model::requests::Request,
        crate::model::requests::RequestStatus,
        crate::model::files::Availability,
        location::NewLocationRequest,
        record::FileReport,
        record::RecordReport,
        request::NewRequestBody,
        request::SubscribeRequest,
        operations::OperationRequest,
        operations::OperationReport,
    )),
    tags(
        (name = "locations", description = "Hot/cold storage location endpoints"),
        (name = "requests", description = "User stage-back request endpoints"),
        (name = "operations", description = "Archive/stage/clear-hot trigger endpoints"),
    ),
    info(
        title = "Cold Storage API",
        version = "0.1.0",
        description = "REST API for the cold-storage subsystem"
    )
)]
pub struct ApiDoc;

pub fn app(services: Services) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/", get(|| async { "cold-storage" }))
        .merge(locations())
        .merge(records())
        .merge(requests())
        .merge(operations())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
                .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .extensions()
                            .get::<RequestId>()
                            .map(|value| value.header_value().to_str().unwrap_or_default())
                            .unwrap_or_default();

                        tracing::info_span!(
                            "HTTP",
                            http.method = %request.method(),
                            http.url = %request.uri(),
                            request_id = %request_id,
                        )
                    }),
                ),
        )
        .layer(Extension(services))
}

fn locations() -> Router {
    Router::new().route("/locations", get(location::list).post(location::add))
}

fn records() -> Router {
    Router::new().route("/records/{recid}", get(record::get))
}

fn requests() -> Router {
    Router::new()
        .route(
            "/records/{recid}/requests",
            get(request::list_for_record).post(request::create),
        )
        .route("/requests/{request_id}/subscribe", post(request::subscribe))
}

fn operations() -> Router {
    Router::new()
        .route("/records/{recid}/archive", post(operations::archive))
        .route("/records/{recid}/stage", post(operations::stage))
        .route("/records/{recid}/clear-hot", post(operations::clear_hot))
        .route("/process-transfers", post(operations::trigger_process_transfers))
        .route("/process-requests", post(operations::trigger_process_requests))
}

pub struct ApiResponse<T> {
    data: T,
    code: StatusCode,
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Send + Sync + Serialize,
{
    fn into_response(self) -> Response {
        let mut response = response::Json(self.data).into_response();
        *response.status_mut() = self.code;
        response
    }
}
