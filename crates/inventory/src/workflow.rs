//! Wires every inventory handler onto the bus.

use std::sync::Arc;

use stockflow_bus::Subscription;

use crate::availability::{recalculate_all_products_availability, recalculate_products_availability};
use crate::catalog::get_all_available_products;
use crate::context::{AppContext, InventoryBus};
use crate::kind::InventoryKind;
use crate::sales::{adjust_inventory, sell_product};

/// Register all workflow handlers. Call once per context.
pub fn register<B: InventoryBus>(app: &Arc<AppContext<B>>) -> Vec<Subscription<InventoryKind>> {
    let bus = app.bus();
    vec![
        bus.consume(get_all_available_products(Arc::clone(app))),
        bus.consume(sell_product(Arc::clone(app))),
        bus.consume(adjust_inventory(Arc::clone(app))),
        bus.consume(recalculate_all_products_availability(Arc::clone(app))),
        bus.consume(recalculate_products_availability(Arc::clone(app))),
    ]
}
