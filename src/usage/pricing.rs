//! Model pricing and cost estimation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Price of one model, per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPrice {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost of a call with the given token counts.
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (f64::from(input_tokens) / 1_000_000.0) * self.input_per_million
            + (f64::from(output_tokens) / 1_000_000.0) * self.output_per_million
    }
}

/// Built-in prices, in monetary units per million tokens.
const BUILTIN_PRICES: &[(&str, ModelPrice)] = &[
    ("gpt-4o", ModelPrice::new(2.50, 10.00)),
    ("gpt-4o-mini", ModelPrice::new(0.15, 0.60)),
    ("gpt-4-turbo", ModelPrice::new(10.00, 30.00)),
    ("gpt-4", ModelPrice::new(30.00, 60.00)),
    ("gpt-3.5-turbo", ModelPrice::new(0.50, 1.50)),
];

/// Used when a model has no entry of its own.
const FALLBACK_PRICE: ModelPrice = ModelPrice::new(2.50, 10.00);

/// Static per-model price table with a fallback for unknown models.
#[derive(Debug, Clone)]
pub struct PriceTable {
    prices: HashMap<String, ModelPrice>,
    fallback: ModelPrice,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            prices: BUILTIN_PRICES
                .iter()
                .map(|(model, price)| ((*model).to_string(), *price))
                .collect(),
            fallback: FALLBACK_PRICE,
        }
    }
}

impl PriceTable {
    /// Table seeded with the built-in prices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the price for a model.
    pub fn with_price(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.prices.insert(model.into(), price);
        self
    }

    /// Replace the price used for unknown models.
    pub fn with_fallback(mut self, price: ModelPrice) -> Self {
        self.fallback = price;
        self
    }

    /// Price for a model, or the fallback when it is unrecognised.
    pub fn price_for(&self, model: &str) -> ModelPrice {
        self.prices.get(model).copied().unwrap_or(self.fallback)
    }

    /// Whether the model has an explicit entry.
    pub fn knows(&self, model: &str) -> bool {
        self.prices.contains_key(model)
    }

    /// Estimate the cost of one call.
    pub fn estimate_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        self.price_for(model).cost(input_tokens, output_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn cost_is_per_million_tokens() {
        let price = ModelPrice::new(2.0, 8.0);
        assert!(close(price.cost(1_000_000, 0), 2.0));
        assert!(close(price.cost(0, 500_000), 4.0));
        assert!(close(price.cost(250_000, 250_000), 0.5 + 2.0));
    }

    #[test]
    fn known_model_uses_its_price() {
        let table = PriceTable::new();
        assert!(table.knows("gpt-4o-mini"));
        assert!(close(table.estimate_cost("gpt-4o-mini", 1_000_000, 1_000_000), 0.75));
    }

    #[test]
    fn unknown_model_uses_fallback() {
        let table = PriceTable::new().with_fallback(ModelPrice::new(1.0, 1.0));
        assert!(!table.knows("mystery-model"));
        assert!(close(table.estimate_cost("mystery-model", 1_000_000, 1_000_000), 2.0));
    }

    #[test]
    fn overrides_replace_builtin_prices() {
        let table = PriceTable::new().with_price("gpt-4o", ModelPrice::new(0.0, 0.0));
        assert!(close(table.estimate_cost("gpt-4o", 10_000, 10_000), 0.0));
    }
}
