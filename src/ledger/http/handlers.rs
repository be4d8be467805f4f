use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    authentication::TokenClaims,
    authorization::require_admin,
    http_err::{ApiError, ApiResponse},
    ledger::{
        domain::{
            accounts::{
                AccountChanges, AccountId, AccountKindName, NewCreditAccountData,
                NewDebitAccountData,
            },
            categories::{
                CategoryId, CategoryKind, NewCategoryData, NewSubCategoryData, SubCategoryId,
            },
            currency::{CurrencyData, CurrencyId},
            transactions::{NewTransactionData, TransactionId},
        },
        services::LedgerService,
    },
    repos::transactions::TransactionQuery,
    server::AppState,
};

use super::reps::{self, EncodedTransactionCursor};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(get_accounts))
        .route(
            "/debit-accounts",
            get(get_debit_accounts).post(create_debit_account),
        )
        .route(
            "/debit-accounts/:account_id",
            get(get_debit_account)
                .put(update_debit_account)
                .delete(delete_debit_account),
        )
        .route(
            "/credit-accounts",
            get(get_credit_accounts).post(create_credit_account),
        )
        .route(
            "/credit-accounts/:account_id",
            get(get_credit_account)
                .put(update_credit_account)
                .delete(delete_credit_account),
        )
        .route(
            "/transactions",
            get(get_transactions).post(create_transaction),
        )
        .route(
            "/transactions/:transaction_id",
            get(get_transaction).delete(delete_transaction),
        )
        .route(
            "/transactions/:transaction_id/restore",
            post(restore_transaction),
        )
        .route("/currencies", get(get_currencies).post(create_currency))
        .route(
            "/currencies/:currency_id",
            get(get_currency).put(update_currency).delete(delete_currency),
        )
        .route("/categories", get(get_categories).post(create_category))
        .route("/categories/:category_id", delete(delete_category))
        .route(
            "/categories/:category_id/sub-categories",
            post(create_sub_category),
        )
        .route(
            "/categories/:category_id/sub-categories/:sub_category_id",
            delete(delete_sub_category),
        )
}

type AccountResponse = ApiResponse<Json<reps::Account>>;
type AccountsResponse = ApiResponse<Json<Vec<reps::Account>>>;

async fn list_accounts(
    claims: &TokenClaims,
    ledger_service: &LedgerService,
    kind: Option<AccountKindName>,
) -> AccountsResponse {
    let accounts = ledger_service
        .list_accounts(claims.user_id(), kind)
        .await?;

    Ok(Json(accounts.iter().map(reps::Account::from).collect()))
}

async fn get_account(
    claims: &TokenClaims,
    ledger_service: &LedgerService,
    account_id: AccountId,
    kind: AccountKindName,
) -> AccountResponse {
    let account = ledger_service
        .get_account(claims.user_id(), account_id, Some(kind))
        .await?;

    Ok(Json((&account).into()))
}

async fn update_account(
    claims: &TokenClaims,
    ledger_service: &LedgerService,
    account_id: AccountId,
    kind: AccountKindName,
    changes: AccountChanges,
) -> AccountResponse {
    let account = ledger_service
        .update_account(claims.user_id(), account_id, kind, changes)
        .await?;

    Ok(Json((&account).into()))
}

async fn delete_account(
    claims: &TokenClaims,
    ledger_service: &LedgerService,
    account_id: AccountId,
    kind: AccountKindName,
) -> ApiResponse<StatusCode> {
    ledger_service
        .delete_account(claims.user_id(), account_id, kind)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn get_accounts(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
) -> AccountsResponse {
    list_accounts(&claims, &ledger_service, None).await
}

async fn get_debit_accounts(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
) -> AccountsResponse {
    list_accounts(&claims, &ledger_service, Some(AccountKindName::Debit)).await
}

async fn create_debit_account(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Json(data): Json<NewDebitAccountData>,
) -> ApiResponse<(StatusCode, Json<reps::Account>)> {
    let account = ledger_service
        .create_debit_account(claims.user_id(), data)
        .await?;

    Ok((StatusCode::CREATED, Json((&account).into())))
}

async fn get_debit_account(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(account_id): Path<AccountId>,
) -> AccountResponse {
    get_account(&claims, &ledger_service, account_id, AccountKindName::Debit).await
}

async fn update_debit_account(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(account_id): Path<AccountId>,
    Json(changes): Json<AccountChanges>,
) -> AccountResponse {
    update_account(
        &claims,
        &ledger_service,
        account_id,
        AccountKindName::Debit,
        changes,
    )
    .await
}

async fn delete_debit_account(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(account_id): Path<AccountId>,
) -> ApiResponse<StatusCode> {
    delete_account(&claims, &ledger_service, account_id, AccountKindName::Debit).await
}

async fn get_credit_accounts(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
) -> AccountsResponse {
    list_accounts(&claims, &ledger_service, Some(AccountKindName::Credit)).await
}

async fn create_credit_account(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Json(data): Json<NewCreditAccountData>,
) -> ApiResponse<(StatusCode, Json<reps::Account>)> {
    let account = ledger_service
        .create_credit_account(claims.user_id(), data)
        .await?;

    Ok((StatusCode::CREATED, Json((&account).into())))
}

async fn get_credit_account(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(account_id): Path<AccountId>,
) -> AccountResponse {
    get_account(&claims, &ledger_service, account_id, AccountKindName::Credit).await
}

async fn update_credit_account(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(account_id): Path<AccountId>,
    Json(changes): Json<AccountChanges>,
) -> AccountResponse {
    update_account(
        &claims,
        &ledger_service,
        account_id,
        AccountKindName::Credit,
        changes,
    )
    .await
}

async fn delete_credit_account(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(account_id): Path<AccountId>,
) -> ApiResponse<StatusCode> {
    delete_account(&claims, &ledger_service, account_id, AccountKindName::Credit).await
}

#[derive(Deserialize)]
struct GetTransactionsParams {
    account_id: Option<AccountId>,
    #[serde(default)]
    include_deleted: bool,
    after: Option<String>,
}

async fn get_transactions(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Query(params): Query<GetTransactionsParams>,
) -> ApiResponse<Json<reps::ResourceCollection<reps::Transaction, EncodedTransactionCursor>>> {
    let after = match params.after.as_deref() {
        Some(encoded) => match EncodedTransactionCursor::decode(encoded) {
            Ok(cursor) => Some(cursor.0),
            Err(error) => {
                debug!(%error, cursor = encoded, "Received malformed transaction cursor.");

                return Err(ApiError::BadRequestReason(
                    "The provided cursor is invalid.".to_owned(),
                ));
            }
        },
        None => None,
    };

    let query = TransactionQuery {
        user_id: claims.user_id(),
        after,
        account_id: params.account_id,
        include_deleted: params.include_deleted,
    };

    let transactions = ledger_service.list_transactions(query).await?;

    Ok(Json(reps::ResourceCollection {
        next: transactions.next.map(Into::into),
        items: transactions
            .items
            .iter()
            .map(reps::Transaction::from)
            .collect(),
    }))
}

async fn create_transaction(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Json(data): Json<NewTransactionData>,
) -> ApiResponse<(StatusCode, Json<reps::Transaction>)> {
    let recorded = ledger_service
        .perform_transaction(claims.user_id(), data)
        .await?;

    let status = if recorded.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json((&recorded.transaction).into())))
}

async fn get_transaction(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(transaction_id): Path<TransactionId>,
) -> ApiResponse<Json<reps::Transaction>> {
    let transaction = ledger_service
        .get_transaction(claims.user_id(), transaction_id)
        .await?;

    Ok(Json((&transaction).into()))
}

async fn delete_transaction(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(transaction_id): Path<TransactionId>,
) -> ApiResponse<StatusCode> {
    ledger_service
        .delete_transaction(claims.user_id(), transaction_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn restore_transaction(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(transaction_id): Path<TransactionId>,
) -> ApiResponse<Json<reps::Transaction>> {
    let transaction = ledger_service
        .restore_transaction(claims.user_id(), transaction_id)
        .await?;

    Ok(Json((&transaction).into()))
}

async fn get_currencies(
    _claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
) -> ApiResponse<Json<Vec<reps::Currency>>> {
    let currencies = ledger_service.list_currencies().await?;

    Ok(Json(currencies.iter().map(reps::Currency::from).collect()))
}

async fn get_currency(
    _claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(currency_id): Path<CurrencyId>,
) -> ApiResponse<Json<reps::Currency>> {
    let currency = ledger_service.get_currency(currency_id).await?;

    Ok(Json((&currency).into()))
}

async fn create_currency(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Json(data): Json<CurrencyData>,
) -> ApiResponse<(StatusCode, Json<reps::Currency>)> {
    require_admin(&claims)?;

    let currency = ledger_service.create_currency(data).await?;

    Ok((StatusCode::CREATED, Json((&currency).into())))
}

async fn update_currency(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(currency_id): Path<CurrencyId>,
    Json(data): Json<CurrencyData>,
) -> ApiResponse<Json<reps::Currency>> {
    require_admin(&claims)?;

    let currency = ledger_service.rename_currency(currency_id, data).await?;

    Ok(Json((&currency).into()))
}

async fn delete_currency(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(currency_id): Path<CurrencyId>,
) -> ApiResponse<StatusCode> {
    require_admin(&claims)?;

    ledger_service.delete_currency(currency_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct GetCategoriesParams {
    kind: Option<CategoryKind>,
}

async fn get_categories(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Query(GetCategoriesParams { kind }): Query<GetCategoriesParams>,
) -> ApiResponse<Json<Vec<reps::Category>>> {
    let categories = ledger_service
        .list_categories(claims.user_id(), kind)
        .await?;

    Ok(Json(categories.iter().map(reps::Category::from).collect()))
}

async fn create_category(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Json(data): Json<NewCategoryData>,
) -> ApiResponse<(StatusCode, Json<reps::Category>)> {
    let category = ledger_service
        .create_category(claims.user_id(), data)
        .await?;

    Ok((StatusCode::CREATED, Json((&category).into())))
}

async fn delete_category(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(category_id): Path<CategoryId>,
) -> ApiResponse<StatusCode> {
    ledger_service
        .delete_category(claims.user_id(), category_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn create_sub_category(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path(category_id): Path<CategoryId>,
    Json(data): Json<NewSubCategoryData>,
) -> ApiResponse<(StatusCode, Json<reps::SubCategory>)> {
    let sub_category = ledger_service
        .create_sub_category(claims.user_id(), category_id, data)
        .await?;

    Ok((StatusCode::CREATED, Json((&sub_category).into())))
}

async fn delete_sub_category(
    claims: TokenClaims,
    State(ledger_service): State<LedgerService>,
    Path((category_id, sub_category_id)): Path<(CategoryId, SubCategoryId)>,
) -> ApiResponse<StatusCode> {
    ledger_service
        .delete_sub_category(claims.user_id(), category_id, sub_category_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
