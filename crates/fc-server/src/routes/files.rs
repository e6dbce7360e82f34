//! File catalog and delivery route handlers.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::{Extension, Json};
use fc_core::events::EventPayload;
use fc_core::{Error, FileId, Identity};
use fc_db::FileRecord;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::{tagged, AppError};
use crate::middleware::request_id::RequestId;

const DEFAULT_PER_PAGE: u32 = 20;

/// A catalog record as exposed over HTTP. The storage path stays internal.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: i64,
    pub stored_name: String,
    pub original_name: String,
    pub title: Option<String>,
    pub uploader: String,
    pub created_at: String,
    pub is_streamable: bool,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl FileResponse {
    pub fn from_record(rec: &FileRecord) -> Self {
        Self {
            id: rec.id.get(),
            stored_name: rec.stored_name.clone(),
            original_name: rec.original_name.clone(),
            title: rec.title.clone(),
            uploader: rec.uploader.clone(),
            created_at: rec.created_at.clone(),
            is_streamable: rec.is_streamable,
            size_bytes: rec.size_bytes,
            mime_type: rec.mime_type.clone(),
        }
    }
}

/// Query parameters for listing files.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Items per page, 1 to 100.
    pub per_page: Option<u32>,
}

/// One page of files.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub items: Vec<FileResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
}

/// Query parameters for searching files.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the original file name.
    pub query: Option<String>,
}

/// Search results.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    pub results: Vec<FileResponse>,
}

fn parse_id(raw: &str) -> Result<FileId, Error> {
    raw.parse()
        .map_err(|_| Error::Validation(format!("invalid file id {raw:?}")))
}

/// GET /files
#[utoipa::path(
    get,
    path = "/files",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of files in upload order", body = ListResponse)
    )
)]
pub async fn list_files(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let page = ctx
        .catalog
        .list(
            params.page.unwrap_or(1),
            params.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
        .map_err(tagged(&request_id))?;

    Ok(Json(ListResponse {
        items: page.items.iter().map(FileResponse::from_record).collect(),
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
    }))
}

/// GET /files/search
#[utoipa::path(
    get,
    path = "/files/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Files whose name contains the keyword", body = SearchResponse)
    )
)]
pub async fn search_files(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let keyword = params.query.unwrap_or_default();
    let results = ctx.catalog.search(&keyword).map_err(tagged(&request_id))?;
    Ok(Json(SearchResponse {
        results: results.iter().map(FileResponse::from_record).collect(),
    }))
}

/// GET /files/{id}/meta
#[utoipa::path(
    get,
    path = "/files/{id}/meta",
    params(("id" = i64, Path, description = "File ID")),
    responses(
        (status = 200, description = "File record", body = FileResponse),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file_meta(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    let lookup = parse_id(&id).and_then(|id| {
        ctx.catalog
            .get_by_id(id)?
            .ok_or_else(|| Error::not_found("file", id))
    });
    let rec = lookup.map_err(tagged(&request_id))?;
    Ok(Json(FileResponse::from_record(&rec)))
}

/// GET /files/{id}
#[utoipa::path(
    get,
    path = "/files/{id}",
    params(
        ("id" = i64, Path, description = "File ID"),
        ("Range" = Option<String>, Header, description = "Single byte range, bytes=start-[end]")
    ),
    responses(
        (status = 200, description = "Full artifact"),
        (status = 206, description = "Requested byte range"),
        (status = 404, description = "Unknown file or missing artifact"),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let id = parse_id(&id).map_err(tagged(&request_id))?;
    // A non-UTF-8 header is malformed; map it to a value that fails parsing.
    let range = headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());

    ctx.delivery()
        .deliver(id, range)
        .await
        .map_err(tagged(&request_id))
}

/// DELETE /files/{id}
#[utoipa::path(
    delete,
    path = "/files/{id}",
    params(("id" = i64, Path, description = "File ID")),
    responses(
        (status = 200, description = "Removed file record", body = FileResponse),
        (status = 403, description = "Caller is neither the uploader nor an admin"),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_file(
    State(ctx): State<AppContext>,
    Extension(identity): Extension<Identity>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    let id = parse_id(&id).map_err(tagged(&request_id))?;
    remove_file(&ctx, &identity, id)
        .await
        .map(|rec| Json(FileResponse::from_record(&rec)))
        .map_err(tagged(&request_id))
}

/// Remove the artifact, then the row.
async fn remove_file(ctx: &AppContext, identity: &Identity, id: FileId) -> fc_core::Result<FileRecord> {
    let rec = ctx
        .catalog
        .get_by_id(id)?
        .ok_or_else(|| Error::not_found("file", id))?;

    if !identity.may_modify(&rec.uploader) {
        return Err(Error::Forbidden(format!(
            "{} may not delete a file uploaded by {}",
            identity.username, rec.uploader
        )));
    }

    let existed = ctx
        .store
        .remove(std::path::Path::new(&rec.storage_path))
        .await?;
    if !existed {
        tracing::error!(file_id = %id, path = %rec.storage_path, "Integrity fault: artifact already missing on delete");
    }

    match ctx.catalog.delete(id) {
        Ok(Some(removed)) => {
            tracing::info!(file_id = %id, deleted_by = %identity.username, "File deleted");
            ctx.event_bus.broadcast(EventPayload::FileDeleted {
                file_id: id,
                deleted_by: identity.username.clone(),
            });
            Ok(removed)
        }
        Ok(None) => Err(Error::not_found("file", id)),
        Err(e) => {
            tracing::error!(file_id = %id, "Artifact removed but catalog row remains: {e}");
            Err(Error::Internal(format!(
                "file {id} artifact was removed but its record could not be deleted: {e}"
            )))
        }
    }
}
