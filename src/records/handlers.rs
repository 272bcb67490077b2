use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    extract::{Json, Path},
    records::{
        dto::{
            CreateCategoryRequest, CreateEntryRequest, CreateShoppingItemRequest, PurchaseRequest,
            PurchaseResponse, RowCountResponse, UpdateShoppingItemRequest,
        },
        repo_types::{Category, DefaultCategory, Entry, EntryKind, ShoppingItem, DEFAULT_CATEGORIES},
        services::Records,
    },
    state::AppState,
};

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/:id", delete(delete_expense))
        .route("/income", get(list_income).post(create_income))
        .route("/income/:id", delete(delete_income))
}

pub fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route("/shopping", get(list_shopping).post(create_shopping))
        .route("/shopping/:id", delete(delete_shopping).put(update_shopping))
        .route("/shopping/:id/purchase", post(purchase))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/defaults", get(default_categories))
        .route("/categories/:id", delete(delete_category))
}

#[instrument(skip(records))]
async fn list_expenses(State(records): State<Records>, user: AuthUser) -> ApiResult<Json<Vec<Entry>>> {
    Ok(Json(records.list_entries(EntryKind::Expense, user.id).await?))
}

#[instrument(skip(records, payload))]
async fn create_expense(
    State(records): State<Records>,
    user: AuthUser,
    Json(payload): Json<CreateEntryRequest>,
) -> ApiResult<Json<Entry>> {
    Ok(Json(records.create_entry(EntryKind::Expense, user.id, payload).await?))
}

#[instrument(skip(records))]
async fn delete_expense(
    State(records): State<Records>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RowCountResponse>> {
    let n = records.delete_entry(EntryKind::Expense, user.id, id).await?;
    Ok(Json(RowCountResponse::deleted(n)))
}

#[instrument(skip(records))]
async fn list_income(State(records): State<Records>, user: AuthUser) -> ApiResult<Json<Vec<Entry>>> {
    Ok(Json(records.list_entries(EntryKind::Income, user.id).await?))
}

#[instrument(skip(records, payload))]
async fn create_income(
    State(records): State<Records>,
    user: AuthUser,
    Json(payload): Json<CreateEntryRequest>,
) -> ApiResult<Json<Entry>> {
    Ok(Json(records.create_entry(EntryKind::Income, user.id, payload).await?))
}

#[instrument(skip(records))]
async fn delete_income(
    State(records): State<Records>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RowCountResponse>> {
    let n = records.delete_entry(EntryKind::Income, user.id, id).await?;
    Ok(Json(RowCountResponse::deleted(n)))
}

#[instrument(skip(records))]
async fn list_shopping(
    State(records): State<Records>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ShoppingItem>>> {
    Ok(Json(records.list_shopping(user.id).await?))
}

#[instrument(skip(records, payload))]
async fn create_shopping(
    State(records): State<Records>,
    user: AuthUser,
    Json(payload): Json<CreateShoppingItemRequest>,
) -> ApiResult<Json<ShoppingItem>> {
    Ok(Json(records.create_shopping(user.id, payload).await?))
}

#[instrument(skip(records))]
async fn update_shopping(
    State(records): State<Records>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShoppingItemRequest>,
) -> ApiResult<Json<RowCountResponse>> {
    let n = records.set_purchased(user.id, id, payload.purchased).await?;
    Ok(Json(RowCountResponse::updated(n)))
}

#[instrument(skip(records))]
async fn delete_shopping(
    State(records): State<Records>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RowCountResponse>> {
    let n = records.delete_shopping(user.id, id).await?;
    Ok(Json(RowCountResponse::deleted(n)))
}

#[instrument(skip(records))]
async fn purchase(
    State(records): State<Records>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PurchaseRequest>,
) -> ApiResult<Json<PurchaseResponse>> {
    let (item, expense) = records.purchase(user.id, id, payload).await?;
    Ok(Json(PurchaseResponse { item, expense }))
}

#[instrument(skip(records))]
async fn list_categories(
    State(records): State<Records>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(records.list_categories(user.id).await?))
}

#[instrument(skip(records, payload))]
async fn create_category(
    State(records): State<Records>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    Ok(Json(records.create_category(user.id, payload).await?))
}

async fn default_categories(_user: AuthUser) -> Json<&'static [DefaultCategory]> {
    Json(DEFAULT_CATEGORIES)
}

#[instrument(skip(records))]
async fn delete_category(
    State(records): State<Records>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RowCountResponse>> {
    let n = records.delete_category(user.id, id).await?;
    Ok(Json(RowCountResponse::deleted(n)))
}
