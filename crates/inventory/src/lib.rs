//! Inventory domain module.
//!
//! Stock records as the stockroom sees them, plus the pure helpers the
//! dashboard derives from them (filters, summaries, pt-BR display). No IO.

pub mod display;
pub mod item;
pub mod seed;
pub mod summary;

pub use display::{format_brl, format_date_br};
pub use item::{
    Classification, InventoryItem, ItemFields, ItemType, LOW_STOCK_THRESHOLD, NEAR_EXPIRY_DAYS,
    NewItem,
};
pub use seed::{SAMPLE_SIZE, sample_items};
pub use summary::InventorySummary;
