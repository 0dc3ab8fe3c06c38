use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{
    BookingId, BookingRecord, BookingSort, BulkActionResult, BulkNotice, DateRangeFilter,
    FilterRequest, RegisteredStatus, Schedule, StatusCountTable,
};
use crate::services::booking_form::{AdminBookingForm, FormError, FormField, ModalOutcome};
use crate::services::gate::{Actor, AdminRequest};
use crate::services::lister::{BookingLister, Listable, StatusFilter};
use crate::services::quicklink::QuicklinkProcessor;
use crate::services::transitions::StatusTransitionProcessor;
use crate::state::AppState;

pub const NONCE_HEADER: &str = "x-booking-nonce";

fn admin_request(headers: &HeaderMap) -> AdminRequest {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    AdminRequest {
        bearer: header("authorization")
            .and_then(|auth| auth.strip_prefix("Bearer ").map(str::to_string)),
        nonce: header(NONCE_HEADER),
    }
}

fn require_viewer(state: &AppState, request: &AdminRequest) -> Result<Actor, AppError> {
    let actor = state.gate.identify(request);
    if !state.gate.can_view_bookings(actor) {
        tracing::warn!("rejected admin request without a valid token");
        return Err(AppError::Unauthenticated);
    }
    Ok(actor)
}

// GET /api/admin/bookings
#[derive(Debug, Default, Deserialize)]
pub struct BookingsQuery {
    #[serde(rename = "start-date")]
    pub start_date: Option<String>,
    #[serde(rename = "end-date")]
    pub end_date: Option<String>,
    pub schedule: Option<String>,
    pub status: Option<String>,
    pub paged: Option<String>,
    pub orderby: Option<String>,
    pub order: Option<String>,
    pub action: Option<String>,
    #[serde(rename = "rtb-quicklink")]
    pub quicklink: Option<String>,
    pub token: Option<String>,
}

impl BookingsQuery {
    fn filter_request(&self) -> FilterRequest {
        FilterRequest {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            schedule: self.schedule.clone(),
            clear: self.action.as_deref() == Some("clear_date_filters"),
        }
    }

    fn page(&self) -> i64 {
        self.paged
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct ActiveFilter {
    pub schedule: Schedule,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current_range: String,
    pub query: FilterRequest,
}

impl From<&DateRangeFilter> for ActiveFilter {
    fn from(filter: &DateRangeFilter) -> Self {
        let query = filter.to_request();
        Self {
            schedule: filter.effective_schedule(),
            start_date: query.start_date.clone(),
            end_date: query.end_date.clone(),
            current_range: filter.current_range(),
            query,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub sortable: bool,
}

#[derive(Debug, Serialize)]
pub struct BookingsPage {
    pub bookings: Vec<BookingRecord>,
    pub pagination: Pagination,
    pub counts: StatusCountTable,
    pub filter: ActiveFilter,
    pub status: Option<StatusFilter>,
    pub sort: BookingSort,
    pub columns: Vec<Column>,
    pub notifications: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<BulkNotice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<BulkActionResult>,
}

fn render_page(
    state: &AppState,
    filter_request: &FilterRequest,
    query: &BookingsQuery,
    results: Option<BulkActionResult>,
) -> Result<BookingsPage, AppError> {
    let mut warnings = Vec::new();

    let (filter, filter_error) = DateRangeFilter::from_request_or_default(filter_request);
    if let Some(e) = filter_error {
        warnings.push(e.to_string());
    }
    let (sort, sort_error) =
        BookingSort::parse_or_default(query.orderby.as_deref(), query.order.as_deref());
    if let Some(e) = sort_error {
        warnings.push(e.to_string());
    }
    let status = StatusFilter::parse(query.status.as_deref());

    let listing = BookingLister::new(state.store.as_ref()).list(
        &filter,
        status.as_ref(),
        sort,
        query.page(),
        state.config.bookings_per_page,
    )?;

    let sortable = listing.sortable_columns();
    let columns = listing
        .columns()
        .iter()
        .map(|&(key, label)| Column {
            key,
            label,
            sortable: sortable.iter().any(|c| c.as_str() == key),
        })
        .collect();

    let mut notifications: Vec<String> = filter.notification().into_iter().collect();
    if let Some(note) = status.as_ref().and_then(|s| s.notification(&listing.counts)) {
        notifications.push(note);
    }

    let page = listing.page;
    Ok(BookingsPage {
        pagination: Pagination {
            page: page.page,
            per_page: page.per_page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        },
        bookings: page.items,
        counts: listing.counts,
        filter: ActiveFilter::from(&filter),
        status,
        sort,
        columns,
        notifications,
        warnings,
        notice: results.as_ref().and_then(BulkActionResult::notice),
        results,
    })
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<BookingsPage>, AppError> {
    let request = admin_request(&headers);
    let actor = require_viewer(&state, &request)?;

    // Quicklinks arrive as plain GETs from email; the signed token stands in for the nonce.
    let results = match query.quicklink.as_deref().filter(|a| !a.is_empty()) {
        Some(action) => {
            let transitions = StatusTransitionProcessor::new(state.store.as_ref(), &state.actions);
            let result = QuicklinkProcessor::new(&state.quicklinks, transitions).apply(
                query.token.as_deref().unwrap_or(""),
                action,
                state.gate.can_manage_bookings(actor),
            )?;
            Some(result)
        }
        None => None,
    };

    Ok(Json(render_page(
        &state,
        &query.filter_request(),
        &query,
        results,
    )?))
}

// POST /api/admin/bookings
#[derive(Debug, Default, Deserialize)]
pub struct BulkActionBody {
    #[serde(rename = "start-date", default)]
    pub start_date: Option<String>,
    #[serde(rename = "end-date", default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub action2: Option<String>,
    #[serde(default)]
    pub bookings: Vec<BookingId>,
}

impl BulkActionBody {
    // The bottom selector is used when the top one is left on `-1`.
    fn selected_action(&self) -> Option<&str> {
        let action = match self.action.as_deref() {
            Some("-1") => self.action2.as_deref(),
            action => action,
        };
        action.filter(|a| !a.is_empty() && *a != "-1")
    }
}

pub async fn post_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
    Json(body): Json<BulkActionBody>,
) -> Result<Json<BookingsPage>, AppError> {
    let request = admin_request(&headers);
    let actor = require_viewer(&state, &request)?;

    let filter_request = query.filter_request().overlay(&FilterRequest {
        start_date: body.start_date.clone(),
        end_date: body.end_date.clone(),
        ..FilterRequest::default()
    });

    let results = match body.selected_action() {
        Some(action) => {
            if !state.gate.is_authentic(&request) {
                tracing::warn!(action, "rejected bulk action without a valid nonce");
                return Err(AppError::Unauthenticated);
            }
            let result = StatusTransitionProcessor::new(state.store.as_ref(), &state.actions)
                .apply(action, &body.bookings, state.gate.can_manage_bookings(actor))?;
            Some(result)
        }
        None => None,
    };

    Ok(Json(render_page(&state, &filter_request, &query, results)?))
}

// GET /api/admin/statuses
pub async fn get_statuses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RegisteredStatus>>, AppError> {
    require_viewer(&state, &admin_request(&headers))?;
    Ok(Json(state.store.registered_statuses()?))
}

// GET /api/admin/nonce
#[derive(Debug, Serialize)]
pub struct NonceResponse {
    nonce: String,
}

pub async fn get_nonce(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<NonceResponse>, AppError> {
    let nonce = state
        .gate
        .issue_nonce(&admin_request(&headers))
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(NonceResponse { nonce }))
}

// POST /api/admin/booking-modal
#[derive(Debug, Deserialize)]
pub struct BookingModalBody {
    #[serde(default)]
    pub booking: Vec<FormField>,
}

pub async fn booking_modal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BookingModalBody>,
) -> Response {
    let request = admin_request(&headers);
    let form = AdminBookingForm::new(
        state.store.as_ref(),
        state.validator.as_ref(),
        state.notifier.as_ref(),
    );

    match form.submit(state.gate.as_ref(), &request, &body.booking).await {
        Ok(ModalOutcome::Saved { booking }) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "booking": booking })),
        )
            .into_response(),
        Ok(ModalOutcome::Invalid { booking, fields }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "success": false,
                "error": "invalid_booking_data",
                "fields": fields,
                "booking": booking,
            })),
        )
            .into_response(),
        Err(FormError::Rejected(e)) => {
            tracing::warn!(error = %e, "booking modal rejected by gate");
            (
                AppError::from(e).into_response().status(),
                Json(serde_json::json!({ "success": false, "error": "loggedout" })),
            )
                .into_response()
        }
        Err(FormError::Store(e)) => AppError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_request_reads_bearer_and_nonce() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        headers.insert(NONCE_HEADER, "abc=".parse().unwrap());

        let request = admin_request(&headers);
        assert_eq!(request.bearer.as_deref(), Some("secret"));
        assert_eq!(request.nonce.as_deref(), Some("abc="));

        let empty = admin_request(&HeaderMap::new());
        assert!(empty.bearer.is_none());
        assert!(empty.nonce.is_none());
    }

    #[test]
    fn test_query_clear_action_and_lenient_page() {
        let query = BookingsQuery {
            start_date: Some("2025-01-01".to_string()),
            action: Some("clear_date_filters".to_string()),
            paged: Some("two".to_string()),
            ..BookingsQuery::default()
        };
        assert!(query.filter_request().clear);
        assert_eq!(query.page(), 1);

        let query = BookingsQuery {
            paged: Some("3".to_string()),
            ..BookingsQuery::default()
        };
        assert!(!query.filter_request().clear);
        assert_eq!(query.page(), 3);
    }

    #[test]
    fn test_active_filter_for_open_range() {
        let filter = DateRangeFilter::parse(Some("2014-12-02"), None, None, false).unwrap();
        let active = ActiveFilter::from(&filter);
        assert_eq!(active.schedule, Schedule::Custom);
        assert_eq!(active.start_date.as_deref(), Some("2014-12-02"));
        assert_eq!(active.current_range, "2014-12-02*");
    }

    #[test]
    fn test_bulk_action_placeholder_falls_back_to_second_selector() {
        let body = |action: Option<&str>, action2: Option<&str>| BulkActionBody {
            action: action.map(str::to_string),
            action2: action2.map(str::to_string),
            ..BulkActionBody::default()
        };
        assert_eq!(body(Some("-1"), None).selected_action(), None);
        assert_eq!(body(Some("-1"), Some("-1")).selected_action(), None);
        assert_eq!(body(Some("-1"), Some("")).selected_action(), None);
        assert_eq!(
            body(Some("-1"), Some("confirmed")).selected_action(),
            Some("confirmed")
        );
        assert_eq!(
            body(Some("closed"), Some("confirmed")).selected_action(),
            Some("closed")
        );
        assert_eq!(body(None, Some("confirmed")).selected_action(), None);
        assert_eq!(body(Some(""), None).selected_action(), None);
    }
}
