mod price_bar;
mod stock_record;

pub use price_bar::{PriceBar, PriceSeries};
pub use stock_record::{DailyPrices, StockRecord};
