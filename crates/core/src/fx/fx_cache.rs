use crate::fx::currency_converter::CurrencyConverter;
use crate::fx::fx_model::RateTable;
use std::sync::{Arc, PoisonError, RwLock};

/// A converter that can be refreshed while readers hold snapshots.
///
/// Readers take an `Arc` snapshot and convert without further locking. A refresh
/// builds a complete converter off to the side and swaps it in under the write
/// lock, so no reader ever observes a half-replaced table.
#[derive(Debug, Default)]
pub struct SharedCurrencyConverter {
    current: RwLock<Arc<CurrencyConverter>>,
}

impl SharedCurrencyConverter {
    pub fn new(converter: CurrencyConverter) -> Self {
        Self {
            current: RwLock::new(Arc::new(converter)),
        }
    }

    /// The converter in effect right now.
    pub fn snapshot(&self) -> Arc<CurrencyConverter> {
        // A poisoned lock still holds a complete converter; the swap is a single store.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Rebuilds the converter from a wholesale table and swaps it in.
    pub fn replace(&self, table: RateTable) {
        let base_currency = self.snapshot().base_currency().to_string();
        let rebuilt = Arc::new(CurrencyConverter::from_table(&base_currency, table));
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = rebuilt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::ExchangeRate;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_snapshot_survives_replace() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 3).unwrap();
        let shared = SharedCurrencyConverter::new(CurrencyConverter::new(
            "CAD",
            vec![ExchangeRate::new("USD", date, dec!(1.35))],
        ));

        let before = shared.snapshot();

        let mut table: RateTable = HashMap::new();
        table
            .entry("USD".to_string())
            .or_default()
            .insert(date, dec!(1.40));
        shared.replace(table);

        let after = shared.snapshot();
        assert_eq!(before.convert_on("USD", dec!(10), date), dec!(13.50));
        assert_eq!(after.convert_on("USD", dec!(10), date), dec!(14.00));
        assert_eq!(after.base_currency(), "CAD");
    }
}
