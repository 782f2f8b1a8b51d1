//! Closed registry of inventory message kinds.

use stockflow_bus::{MessageClass, MessageKind};

/// Every message the inventory workflow exchanges over the bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InventoryKind {
    GetAllAvailableProducts,
    SellProduct,
    SellProductFailed,
    ProductSold,
    RecalculateAllProductsAvailability,
    RecalculateProductsAvailability,
    RecalculateProductsAvailabilityFailed,
}

impl MessageKind for InventoryKind {
    fn name(&self) -> &'static str {
        match self {
            InventoryKind::GetAllAvailableProducts => "GetAllAvailableProducts",
            InventoryKind::SellProduct => "SellProduct",
            InventoryKind::SellProductFailed => "SellProductFailed",
            InventoryKind::ProductSold => "ProductSold",
            InventoryKind::RecalculateAllProductsAvailability => {
                "RecalculateAllProductsAvailability"
            }
            InventoryKind::RecalculateProductsAvailability => "RecalculateProductsAvailability",
            InventoryKind::RecalculateProductsAvailabilityFailed => {
                "RecalculateProductsAvailabilityFailed"
            }
        }
    }

    fn class(&self) -> MessageClass {
        match self {
            InventoryKind::GetAllAvailableProducts => MessageClass::Query,
            InventoryKind::SellProduct
            | InventoryKind::RecalculateAllProductsAvailability
            | InventoryKind::RecalculateProductsAvailability => MessageClass::Command,
            InventoryKind::SellProductFailed
            | InventoryKind::ProductSold
            | InventoryKind::RecalculateProductsAvailabilityFailed => MessageClass::Event,
        }
    }
}

impl core::fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Implements the bus message traits for a type named like its kind variant.
macro_rules! inventory_message {
    (command $ty:ident) => {
        impl stockflow_bus::Message for $ty {
            type Kind = $crate::kind::InventoryKind;
            type Reply = ();
            const KIND: $crate::kind::InventoryKind = $crate::kind::InventoryKind::$ty;
        }
        impl stockflow_bus::Command for $ty {}
    };
    (event $ty:ident) => {
        impl stockflow_bus::Message for $ty {
            type Kind = $crate::kind::InventoryKind;
            type Reply = ();
            const KIND: $crate::kind::InventoryKind = $crate::kind::InventoryKind::$ty;
        }
        impl stockflow_bus::Event for $ty {}
    };
    (query $ty:ident => $reply:ty) => {
        impl stockflow_bus::Message for $ty {
            type Kind = $crate::kind::InventoryKind;
            type Reply = $reply;
            const KIND: $crate::kind::InventoryKind = $crate::kind::InventoryKind::$ty;
        }
        impl stockflow_bus::Query for $ty {}
    };
}

pub(crate) use inventory_message;

#[cfg(test)]
mod tests {
    use stockflow_bus::Message;

    use super::*;
    use crate::catalog::GetAllAvailableProducts;
    use crate::sales::SellProduct;
    use stockflow_core::ProductId;

    #[test]
    fn kinds_display_as_their_names() {
        assert_eq!(InventoryKind::SellProduct.to_string(), "SellProduct");
        assert_eq!(
            InventoryKind::RecalculateProductsAvailabilityFailed.to_string(),
            "RecalculateProductsAvailabilityFailed"
        );
    }

    #[test]
    fn classes_match_the_workflow() {
        assert_eq!(InventoryKind::GetAllAvailableProducts.class(), MessageClass::Query);
        assert_eq!(InventoryKind::SellProduct.class(), MessageClass::Command);
        assert_eq!(InventoryKind::ProductSold.class(), MessageClass::Event);
        assert_eq!(GetAllAvailableProducts::KIND, InventoryKind::GetAllAvailableProducts);
    }

    #[test]
    fn messages_describe_themselves_as_json() {
        let command = SellProduct {
            product_id: ProductId::new("p-1"),
            amount: 2,
        };
        let rendered: serde_json::Value = serde_json::from_str(&command.describe()).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({ "type": "SellProduct", "product_id": "p-1", "amount": 2 })
        );
    }
}
