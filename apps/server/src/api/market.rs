use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use wolfee_market_data::{History, HistoryPeriod, ProviderKind, ProviderStats, Quote};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    market_service::Tier,
};

#[derive(Serialize)]
struct StockList {
    stocks: Vec<String>,
    commodities: Vec<String>,
}

#[derive(Serialize)]
struct MarketData {
    stocks: Arc<Vec<Quote>>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    period: Option<String>,
}

#[derive(Serialize)]
struct ProviderStatsResponse {
    providers: Vec<ProviderStats>,
    quote_order: Vec<ProviderKind>,
    history_order: Vec<ProviderKind>,
}

async fn get_stocks(State(state): State<Arc<AppState>>) -> Json<StockList> {
    let universe = state.market_service.universe();
    Json(StockList {
        stocks: universe
            .bist
            .iter()
            .chain(&universe.global)
            .cloned()
            .collect(),
        commodities: universe.commodities.clone(),
    })
}

async fn get_quick_market_data(State(state): State<Arc<AppState>>) -> Json<MarketData> {
    Json(MarketData {
        stocks: state.market_service.snapshot(Tier::Quick).await,
    })
}

async fn get_full_market_data(State(state): State<Arc<AppState>>) -> Json<MarketData> {
    Json(MarketData {
        stocks: state.market_service.snapshot(Tier::Full).await,
    })
}

async fn get_quote(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Quote>> {
    state
        .market_service
        .quote(&symbol)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Stock data not found".to_string()))
}

async fn get_history(
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<History>> {
    let period = match query.period.as_deref() {
        Some(raw) => raw.parse::<HistoryPeriod>().map_err(ApiError::BadRequest)?,
        None => HistoryPeriod::FiveYears,
    };

    state
        .market_service
        .history(&symbol, period)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No history found".to_string()))
}

async fn get_provider_stats(State(state): State<Arc<AppState>>) -> Json<ProviderStatsResponse> {
    let orchestrator = state.market_service.orchestrator();
    Json(ProviderStatsResponse {
        providers: orchestrator.stats(),
        quote_order: orchestrator.order().quotes.clone(),
        history_order: orchestrator.order().history.clone(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks", get(get_stocks))
        // Legacy path, same as the quick tier
        .route("/market-data", get(get_quick_market_data))
        .route("/market-data/quick", get(get_quick_market_data))
        .route("/market-data/full", get(get_full_market_data))
        .route("/quote/{symbol}", get(get_quote))
        .route("/history/{symbol}", get(get_history))
        .route("/providers/stats", get(get_provider_stats))
}
