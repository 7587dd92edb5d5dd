//! Sample stock used by "Gerar Dados de Teste".

use chrono::{Duration, NaiveDate};

use crate::item::{Classification, ItemType, NewItem};

/// Number of records in the sample set.
pub const SAMPLE_SIZE: usize = 5;

/// The fixed sample set, with expiry dates anchored on `today`.
///
/// Spans both classifications and both types, and always contains one item
/// near expiry and one below the low-stock threshold.
pub fn sample_items(today: NaiveDate) -> Vec<NewItem> {
    vec![
        NewItem::new("Paracetamol 750mg", 150, 0.45)
            .with_batch("L8832")
            .with_expiry(today + Duration::days(420)),
        NewItem::new("Seringa 5ml", 30, 0.25)
            .with_batch("S1029")
            .with_expiry(today + Duration::days(600))
            .with_classification(Classification::Materiais),
        NewItem::new("Amoxicilina 500mg", 80, 1.20)
            .with_batch("A9001")
            .with_expiry(today + Duration::days(20))
            .with_type(ItemType::Controlados),
        NewItem::new("Luva Procedimento M", 1000, 0.15)
            .with_batch("LP2023")
            .with_expiry(today + Duration::days(800))
            .with_classification(Classification::Materiais),
        NewItem::new("Dipirona Sódica", 200, 0.60)
            .with_batch("D4421")
            .with_expiry(today + Duration::days(180)),
    ]
}
