//! Resource accessors: thin mappings from named parameters to query keys.
//!
//! Each method names an endpoint path, renders its parameters, and
//! forwards to the request pipeline. Optional parameters are omitted from
//! the query string so the server applies its own defaults. Decoded
//! bodies come back as `serde_json::Value`; reshape with
//! [`DataTable::from_records`](crate::models::DataTable::from_records)
//! when a tabular view is wanted.

use chrono::NaiveDate;
use serde_json::Value;

use crate::errors::FmpError;
use crate::models::ScreenerQuery;

use super::FmpClient;

type Params = Vec<(&'static str, String)>;

fn validate_symbol(symbol: &str) -> Result<&str, FmpError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(FmpError::InvalidArgument(
            "the 'symbol' parameter must be a non-empty string".to_string(),
        ));
    }
    Ok(symbol)
}

fn push_date(params: &mut Params, key: &'static str, date: Option<NaiveDate>) {
    if let Some(date) = date {
        params.push((key, date.format("%Y-%m-%d").to_string()));
    }
}

impl FmpClient {
    // ========================================================================
    // Search
    // ========================================================================

    /// Search for stock symbols matching a query string.
    pub async fn search_symbol(
        &self,
        query: &str,
        limit: u32,
        exchange: Option<&str>,
    ) -> Result<Value, FmpError> {
        let mut params: Params = vec![("query", query.to_string()), ("limit", limit.to_string())];
        if let Some(exchange) = exchange {
            params.push(("exchange", exchange.to_string()));
        }
        self.pipeline().request("search-symbol", &params).await
    }

    /// Search for companies by name.
    pub async fn search_company_name(
        &self,
        query: &str,
        limit: u32,
        exchange: Option<&str>,
    ) -> Result<Value, FmpError> {
        let mut params: Params = vec![("query", query.to_string()), ("limit", limit.to_string())];
        if let Some(exchange) = exchange {
            params.push(("exchange", exchange.to_string()));
        }
        self.pipeline().request("search-name", &params).await
    }

    // ========================================================================
    // Quote and price data
    // ========================================================================

    /// Current quote: price, volume, day change.
    pub async fn quote(&self, symbol: &str) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        self.pipeline()
            .request("quote", &[("symbol", symbol.to_string())])
            .await
    }

    /// Dividend-adjusted end-of-day historical prices.
    pub async fn eod_adjusted(
        &self,
        symbol: &str,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let mut params: Params = vec![("symbol", symbol.to_string())];
        push_date(&mut params, "from", date_from);
        push_date(&mut params, "to", date_to);
        self.pipeline()
            .request("historical-price-eod/dividend-adjusted", &params)
            .await
    }

    /// Full historical EOD prices: OHLCV with change, changePercent, vwap.
    pub async fn historical_price_full(
        &self,
        symbol: &str,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let mut params: Params = vec![("symbol", symbol.to_string())];
        push_date(&mut params, "from", date_from);
        push_date(&mut params, "to", date_to);
        self.pipeline()
            .request("historical-price-eod/full", &params)
            .await
    }

    /// Historical index prices. `None` targets the S&P 500 (`^GSPC`).
    pub async fn index_historical_price(
        &self,
        symbol: Option<&str>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Value, FmpError> {
        let symbol = symbol.unwrap_or("^GSPC");
        let mut params: Params = vec![("symbol", symbol.to_string())];
        push_date(&mut params, "from", date_from);
        push_date(&mut params, "to", date_to);
        self.pipeline()
            .request("historical-price-eod/full", &params)
            .await
    }

    /// Historical market capitalization, for point-in-time size screens.
    pub async fn historical_market_cap(
        &self,
        symbol: &str,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let mut params: Params = vec![("symbol", symbol.to_string())];
        push_date(&mut params, "from", date_from);
        push_date(&mut params, "to", date_to);
        self.pipeline()
            .request("historical-market-capitalization", &params)
            .await
    }

    // ========================================================================
    // Company fundamentals
    // ========================================================================

    /// Company profile: sector, industry, description, market cap.
    pub async fn company_profile(&self, symbol: &str) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        self.pipeline()
            .request("profile", &[("symbol", symbol.to_string())])
            .await
    }

    /// Enterprise value metrics over `limit` periods.
    pub async fn enterprise_values(
        &self,
        symbol: &str,
        limit: u32,
        period: &str,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("limit", limit.to_string()),
            ("period", period.to_string()),
        ];
        self.pipeline().request("enterprise-values", &params).await
    }

    /// Financial ratios (P/E, P/B, ROE, debt/equity, ...). Period is
    /// `"FY"` for annual or `"quarter"`.
    pub async fn financial_ratios(
        &self,
        symbol: &str,
        limit: u32,
        period: &str,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("limit", limit.to_string()),
            ("period", period.to_string()),
        ];
        self.pipeline().request("ratios", &params).await
    }

    /// Revenue, earnings, and EPS growth rates.
    pub async fn financial_growth(
        &self,
        symbol: &str,
        limit: u32,
        period: &str,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("limit", limit.to_string()),
            ("period", period.to_string()),
        ];
        self.pipeline().request("financial-growth", &params).await
    }

    /// Earnings reports: EPS, revenue, surprises.
    pub async fn earnings(&self, symbol: &str, limit: u32) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![("symbol", symbol.to_string()), ("limit", limit.to_string())];
        self.pipeline().request("earnings", &params).await
    }

    /// Revenue breakdown by product segment. Structure is `"flat"` or
    /// `"nested"`.
    pub async fn revenue_product_segmentation(
        &self,
        symbol: &str,
        period: &str,
        structure: &str,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("structure", structure.to_string()),
        ];
        self.pipeline()
            .request("revenue-product-segmentation", &params)
            .await
    }

    /// Historical income statements. Includes filingDate for
    /// point-in-time accuracy.
    pub async fn income_statement(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("limit", limit.to_string()),
        ];
        self.pipeline().request("income-statement", &params).await
    }

    /// Historical balance sheet statements.
    pub async fn balance_sheet(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("limit", limit.to_string()),
        ];
        self.pipeline()
            .request("balance-sheet-statement", &params)
            .await
    }

    /// Historical cash flow statements.
    pub async fn cash_flow_statement(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("limit", limit.to_string()),
        ];
        self.pipeline()
            .request("cash-flow-statement", &params)
            .await
    }

    /// Historical key metrics (PE, PB, EV/EBITDA, ROE, ...).
    pub async fn key_metrics(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("limit", limit.to_string()),
        ];
        self.pipeline().request("key-metrics", &params).await
    }

    /// Historical income statement growth rates.
    pub async fn income_statement_growth(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("limit", limit.to_string()),
        ];
        self.pipeline()
            .request("income-statement-growth", &params)
            .await
    }

    // ========================================================================
    // Analyst and market data
    // ========================================================================

    /// Analyst price target consensus (high, low, average).
    pub async fn price_target_consensus(&self, symbol: &str) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        self.pipeline()
            .request("price-target-consensus", &[("symbol", symbol.to_string())])
            .await
    }

    /// News articles for a stock, paginated.
    pub async fn stock_news(
        &self,
        symbol: &str,
        limit: u32,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        page: u32,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let mut params: Params = vec![
            ("symbols", symbol.to_string()),
            ("limit", limit.to_string()),
            ("page", page.to_string()),
        ];
        push_date(&mut params, "from", date_from);
        push_date(&mut params, "to", date_to);
        self.pipeline().request("news/stock", &params).await
    }

    /// Price target news articles, paginated.
    pub async fn price_target_news(
        &self,
        symbol: &str,
        limit: u32,
        page: u32,
    ) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        let params: Params = vec![
            ("symbols", symbol.to_string()),
            ("limit", limit.to_string()),
            ("page", page.to_string()),
        ];
        self.pipeline()
            .request("news/price-target-news", &params)
            .await
    }

    // ========================================================================
    // Stock screening
    // ========================================================================

    /// Screen stocks by the given filter set; unset filters are left to
    /// the server's defaults.
    pub async fn screen_stocks(&self, query: &ScreenerQuery) -> Result<Value, FmpError> {
        self.pipeline()
            .request("company-screener", &query.to_params())
            .await
    }

    // ========================================================================
    // Index constituents
    // ========================================================================

    /// Current S&P 500 constituents.
    pub async fn sp500_constituents(&self) -> Result<Value, FmpError> {
        self.pipeline().request("sp500-constituent", &[]).await
    }

    /// Historical S&P 500 additions and removals, with dates, for
    /// survivorship-safe backtesting.
    pub async fn historical_sp500_constituents(&self) -> Result<Value, FmpError> {
        self.pipeline()
            .request("historical-sp500-constituent", &[])
            .await
    }

    /// Current NASDAQ 100 constituents.
    pub async fn nasdaq_constituents(&self) -> Result<Value, FmpError> {
        self.pipeline().request("nasdaq-constituent", &[]).await
    }

    /// Historical NASDAQ 100 additions and removals.
    pub async fn historical_nasdaq_constituents(&self) -> Result<Value, FmpError> {
        self.pipeline()
            .request("historical-nasdaq-constituent", &[])
            .await
    }

    // ========================================================================
    // Corporate events
    // ========================================================================

    /// Historical stock splits, for price adjustment.
    pub async fn stock_splits(&self, symbol: &str) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        self.pipeline()
            .request("splits", &[("symbol", symbol.to_string())])
            .await
    }

    /// Historical dividends, for total return calculation.
    pub async fn dividends(&self, symbol: &str) -> Result<Value, FmpError> {
        let symbol = validate_symbol(symbol)?;
        self.pipeline()
            .request("dividends", &[("symbol", symbol.to_string())])
            .await
    }

    // ========================================================================
    // Market context
    // ========================================================================

    /// Historical performance by sector.
    pub async fn historical_sector_performance(&self) -> Result<Value, FmpError> {
        self.pipeline()
            .request("historical-sector-performance", &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheBackend;
    use crate::errors::FmpError;
    use crate::transport::{HttpResponse, Transport};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Transport that records every call and answers 200 with a fixed
    /// body.
    struct RecordingTransport {
        calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
        body: String,
    }

    impl RecordingTransport {
        fn new(body: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                body: body.to_string(),
            })
        }

        fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn get(
            &self,
            url: &str,
            params: &[(String, String)],
        ) -> Result<HttpResponse, FmpError> {
            self.calls.lock().unwrap().push((url.to_string(), params.to_vec()));
            Ok(HttpResponse {
                status: 200,
                body: self.body.clone(),
            })
        }
    }

    fn client_with(transport: Arc<RecordingTransport>) -> FmpClient {
        FmpClient::builder()
            .api_key("test-key")
            .cache_backend(CacheBackend::Memory)
            .transport(transport)
            .build()
            .unwrap()
    }

    fn param(calls: &[(String, Vec<(String, String)>)], name: &str) -> Option<String> {
        calls[0]
            .1
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    #[tokio::test]
    async fn test_quote_maps_endpoint_and_symbol() {
        let transport = RecordingTransport::new(r#"[{"symbol":"AAPL","price":175.5}]"#);
        let client = client_with(Arc::clone(&transport));

        let value = client.quote("AAPL").await.unwrap();
        assert_eq!(value[0]["symbol"], "AAPL");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.ends_with("/quote"));
        assert_eq!(param(&calls, "symbol").as_deref(), Some("AAPL"));
        // credential is the transport's concern, not the accessor's
        assert!(param(&calls, "apikey").is_none());
    }

    #[tokio::test]
    async fn test_blank_symbol_is_rejected_before_any_network_activity() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        let err = client.quote("   ").await.unwrap_err();
        assert!(matches!(err, FmpError::InvalidArgument(_)));

        let err = client.dividends("").await.unwrap_err();
        assert!(matches!(err, FmpError::InvalidArgument(_)));

        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_repeat_quote_is_served_from_cache() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        client.quote("AAPL").await.unwrap();
        client.quote("AAPL").await.unwrap();
        client.quote("NVDA").await.unwrap();

        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_date_range_parameters_are_optional() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        client
            .eod_adjusted("AAPL", NaiveDate::from_ymd_opt(2024, 1, 2), None)
            .await
            .unwrap();

        let calls = transport.calls();
        assert!(calls[0].0.ends_with("/historical-price-eod/dividend-adjusted"));
        assert_eq!(param(&calls, "from").as_deref(), Some("2024-01-02"));
        assert!(param(&calls, "to").is_none());
    }

    #[tokio::test]
    async fn test_index_history_defaults_to_sp500() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        client.index_historical_price(None, None, None).await.unwrap();

        let calls = transport.calls();
        assert!(calls[0].0.ends_with("/historical-price-eod/full"));
        assert_eq!(param(&calls, "symbol").as_deref(), Some("^GSPC"));
    }

    #[tokio::test]
    async fn test_screener_omits_unset_filters() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        let query = ScreenerQuery {
            sector: Some("Technology".to_string()),
            ..Default::default()
        };
        client.screen_stocks(&query).await.unwrap();

        let calls = transport.calls();
        assert!(calls[0].0.ends_with("/company-screener"));
        assert_eq!(param(&calls, "sector").as_deref(), Some("Technology"));
        assert_eq!(param(&calls, "isActivelyTrading").as_deref(), Some("true"));
        assert!(param(&calls, "marketCapMoreThan").is_none());
    }

    #[tokio::test]
    async fn test_stock_news_uses_plural_symbols_key() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        client.stock_news("AAPL", 50, None, None, 0).await.unwrap();

        let calls = transport.calls();
        assert!(calls[0].0.ends_with("/news/stock"));
        assert_eq!(param(&calls, "symbols").as_deref(), Some("AAPL"));
        assert_eq!(param(&calls, "page").as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_constituent_endpoints_take_no_parameters() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        client.sp500_constituents().await.unwrap();
        client.historical_nasdaq_constituents().await.unwrap();

        let calls = transport.calls();
        assert!(calls[0].0.ends_with("/sp500-constituent"));
        assert!(calls[0].1.is_empty());
        assert!(calls[1].0.ends_with("/historical-nasdaq-constituent"));
    }

    #[tokio::test]
    async fn test_clear_cache_forces_a_refetch() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        client.quote("AAPL").await.unwrap();
        client.clear_cache().unwrap();
        client.quote("AAPL").await.unwrap();

        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_financial_statement_accessors_share_parameter_shape() {
        let transport = RecordingTransport::new("[]");
        let client = client_with(Arc::clone(&transport));

        client.income_statement("AAPL", "annual", 5).await.unwrap();
        client.balance_sheet("AAPL", "annual", 5).await.unwrap();
        client.key_metrics("AAPL", "quarter", 4).await.unwrap();

        let calls = transport.calls();
        assert!(calls[0].0.ends_with("/income-statement"));
        assert!(calls[1].0.ends_with("/balance-sheet-statement"));
        assert!(calls[2].0.ends_with("/key-metrics"));
        assert_eq!(calls[2].1.len(), 3);
    }
}
