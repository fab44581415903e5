/// Filter set for the stock screener endpoint.
///
/// Unset filters are omitted from the query string so the server applies
/// its own defaults. Field names map to the API's camelCase query keys.
#[derive(Clone, Debug)]
pub struct ScreenerQuery {
    /// Minimum market cap (e.g. 1_000_000_000 for $1B).
    pub market_cap_more_than: Option<u64>,
    /// Maximum market cap.
    pub market_cap_lower_than: Option<u64>,
    /// Minimum average volume.
    pub volume_more_than: Option<u64>,
    /// Maximum average volume.
    pub volume_lower_than: Option<u64>,
    /// Minimum stock price.
    pub price_more_than: Option<f64>,
    /// Maximum stock price.
    pub price_lower_than: Option<f64>,
    /// Minimum beta (volatility vs market).
    pub beta_more_than: Option<f64>,
    /// Maximum beta.
    pub beta_lower_than: Option<f64>,
    /// Minimum dividend yield (e.g. 0.02 for 2%).
    pub dividend_more_than: Option<f64>,
    /// Maximum dividend yield.
    pub dividend_lower_than: Option<f64>,
    /// Sector filter (e.g. "Technology").
    pub sector: Option<String>,
    /// Industry filter.
    pub industry: Option<String>,
    /// Exchange filter (e.g. "NASDAQ", "NYSE").
    pub exchange: Option<String>,
    /// Country code (e.g. "US").
    pub country: Option<String>,
    /// Include ETFs.
    pub is_etf: bool,
    /// Include funds.
    pub is_fund: bool,
    /// Only actively trading stocks.
    pub is_actively_trading: bool,
    /// Maximum results to return.
    pub limit: u32,
}

impl Default for ScreenerQuery {
    fn default() -> Self {
        Self {
            market_cap_more_than: None,
            market_cap_lower_than: None,
            volume_more_than: None,
            volume_lower_than: None,
            price_more_than: None,
            price_lower_than: None,
            beta_more_than: None,
            beta_lower_than: None,
            dividend_more_than: None,
            dividend_lower_than: None,
            sector: None,
            industry: None,
            exchange: None,
            country: None,
            is_etf: false,
            is_fund: false,
            is_actively_trading: true,
            limit: 100,
        }
    }
}

impl ScreenerQuery {
    /// Render the set filters as query parameters with API key names.
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = Vec::new();

        fn push<T: ToString>(
            params: &mut Vec<(&'static str, String)>,
            key: &'static str,
            value: &Option<T>,
        ) {
            if let Some(value) = value {
                params.push((key, value.to_string()));
            }
        }

        push(&mut params, "marketCapMoreThan", &self.market_cap_more_than);
        push(&mut params, "marketCapLowerThan", &self.market_cap_lower_than);
        push(&mut params, "volumeMoreThan", &self.volume_more_than);
        push(&mut params, "volumeLowerThan", &self.volume_lower_than);
        push(&mut params, "priceMoreThan", &self.price_more_than);
        push(&mut params, "priceLowerThan", &self.price_lower_than);
        push(&mut params, "betaMoreThan", &self.beta_more_than);
        push(&mut params, "betaLowerThan", &self.beta_lower_than);
        push(&mut params, "dividendMoreThan", &self.dividend_more_than);
        push(&mut params, "dividendLowerThan", &self.dividend_lower_than);
        push(&mut params, "sector", &self.sector);
        push(&mut params, "industry", &self.industry);
        push(&mut params, "exchange", &self.exchange);
        push(&mut params, "country", &self.country);
        params.push(("isEtf", self.is_etf.to_string()));
        params.push(("isFund", self.is_fund.to_string()));
        params.push(("isActivelyTrading", self.is_actively_trading.to_string()));
        params.push(("limit", self.limit.to_string()));

        params
    }
}
