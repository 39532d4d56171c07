use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::reports::{
        CreateSaleRequest, CsvExportQuery, ReportRangeQuery, SaleList, SalesSummary,
        UpdateSaleRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Sale,
    response::ApiResponse,
    services::report_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(sales_summary))
        .route("/export", get(export_csv))
        .route("/sales", get(list_sales).post(create_sale))
        .route("/sales/{id}", patch(update_sale).delete(delete_sale))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/summary",
    params(
        ("start" = Option<String>, Query, description = "RFC 3339 start of window, default 30 days ago"),
        ("end" = Option<String>, Query, description = "RFC 3339 end of window, default now")
    ),
    responses(
        (status = 200, description = "Totals, rollups and mover lists", body = ApiResponse<SalesSummary>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn sales_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportRangeQuery>,
) -> AppResult<Json<ApiResponse<SalesSummary>>> {
    Ok(Json(
        report_service::sales_summary(&state, &user, query).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/export",
    params(
        ("days" = Option<i64>, Query, description = "Trailing window in days, default 30")
    ),
    responses(
        (status = 200, description = "Sales report as CSV", content_type = "text/csv"),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn export_csv(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CsvExportQuery>,
) -> AppResult<impl IntoResponse> {
    let (filename, body) = report_service::export_csv(&state, &user, query).await?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, body))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/sales",
    params(
        ("start" = Option<String>, Query, description = "RFC 3339 start of window, default 30 days ago"),
        ("end" = Option<String>, Query, description = "RFC 3339 end of window, default now")
    ),
    responses(
        (status = 200, description = "Sale rows in the window", body = ApiResponse<SaleList>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportRangeQuery>,
) -> AppResult<Json<ApiResponse<SaleList>>> {
    Ok(Json(report_service::list_sales(&state, &user, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/reports/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 200, description = "Manual sale row recorded", body = ApiResponse<Sale>),
        (status = 400, description = "Negative amount"),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSaleRequest>,
) -> AppResult<Json<ApiResponse<Sale>>> {
    Ok(Json(
        report_service::create_sale(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    patch,
    path = "/api/admin/reports/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    request_body = UpdateSaleRequest,
    responses(
        (status = 200, description = "Sale row corrected", body = ApiResponse<Sale>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Sale not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn update_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSaleRequest>,
) -> AppResult<Json<ApiResponse<Sale>>> {
    Ok(Json(
        report_service::update_sale(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/admin/reports/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale row removed", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Sale not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn delete_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(report_service::delete_sale(&state, &user, id).await?))
}
