//! Purchase intent — the resolved, immutable checkout snapshot.

use serde::{Deserialize, Serialize};

use marigold_core::{IntentSource, Price, ProductId};

/// One resolved product+quantity+variant entry within a purchase intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    /// Product name at resolution time.
    pub name: String,
    /// Unit price at resolution time. This is what gets charged and
    /// persisted, even if the live price changes mid-checkout.
    pub unit_price: Price,
    pub quantity: u32,
    pub variant: Option<String>,
}

impl LineItem {
    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

/// A resolved snapshot of what this checkout session is buying.
///
/// Taken once per checkout session; it never re-reads live cart or product
/// state afterwards, so a cart mutation mid-checkout cannot silently change
/// what is priced, charged and persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseIntent {
    /// The resolved line items. Never empty.
    pub items: Vec<LineItem>,
    /// Whether this was a cart checkout or a direct "buy now".
    pub source: IntentSource,
}

impl PurchaseIntent {
    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// The direct-purchase signal carried in navigation parameters.
///
/// When present and well-formed it always takes priority over the cart,
/// even if the cart is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectPurchase {
    pub product_id: ProductId,
    pub quantity: u32,
    pub variant: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_totals() {
        let intent = PurchaseIntent {
            items: vec![
                LineItem {
                    product_id: ProductId::new(1),
                    name: "Kurta".into(),
                    unit_price: Price::from_rupees(799),
                    quantity: 2,
                    variant: Some("M".into()),
                },
                LineItem {
                    product_id: ProductId::new(2),
                    name: "Mojari".into(),
                    unit_price: Price::from_rupees(1299),
                    quantity: 1,
                    variant: None,
                },
            ],
            source: IntentSource::Cart,
        };

        assert_eq!(intent.subtotal(), Price::from_rupees(2897));
        assert_eq!(intent.unit_count(), 3);
    }
}
