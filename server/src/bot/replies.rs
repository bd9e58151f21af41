// paygate/server/src/bot/replies.rs

//! Chat wording. Everything a buyer or the admin reads is rendered here.

use paygate::{EntryReply, Order, OrderState, PaygateError, Product};

pub const ADMIN_HELP: &str = "👋 Welcome, admin!\n\n\
  /add_product - Add a new product\n\
  /replace_product <id> - Replace an existing product\n\
  /products - List products\n\
  /stats - Order statistics\n\
  /broadcast <message> - Message every buyer\n\
  /cancel - Abort the current product entry";

pub const BUYER_WELCOME: &str = "👋 Welcome! Pick a product below to get access.";
pub const EMPTY_CATALOG: &str = "🛍️ No products available yet. Please check back later.";
pub const RATE_LIMITED: &str = "⏳ Please wait a moment before trying again.";
pub const UNKNOWN_COMMAND: &str = "❓ Unknown command. Send /start to see what I can do.";
pub const REPLACE_USAGE: &str = "Usage: /replace_product <product_id>";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const PROOF_RECEIVED: &str = "📨 Thanks! Your payment proof was forwarded for review.\n\
  Payments are confirmed automatically as soon as the gateway notifies us.";
pub const BROADCAST_USAGE: &str = "Usage: /broadcast <message>";
pub const NO_SESSION_HINT: &str = "No product entry in progress. Send /add_product to start one.";
pub const NO_ORDERS: &str = "🧾 You have no orders yet. Send /start to browse products.";

pub fn entry_reply(reply: &EntryReply) -> String {
  match reply {
    EntryReply::Prompt(step) => format!("Step {}/4: {}", step.number(), step.prompt()),
    EntryReply::Reprompt { step, reason } => {
      format!("{}\n\nStep {}/4: {}", reason, step.number(), step.prompt())
    }
    EntryReply::Committed(product) => format!(
      "✅ Product saved!\n\nID: {}\nName: {}\nPrice: {}\nDescription: {}",
      product.id, product.name, product.price, product.description
    ),
    EntryReply::Cancelled => "❌ Product entry cancelled.".to_string(),
    EntryReply::Expired => "⌛ Your product entry timed out. Send /add_product to start again.".to_string(),
    EntryReply::NoSession => NOTHING_TO_CANCEL.to_string(),
  }
}

pub fn product_caption(product: &Product) -> String {
  format!("🛍️ {}\n\n{}\n\n💰 Price: {}", product.name, product.description, product.price)
}

pub fn catalog_listing(products: &[Product]) -> String {
  if products.is_empty() {
    return EMPTY_CATALOG.to_string();
  }
  let lines: Vec<String> = products.iter().map(|p| format!("{} ({})", p.summary(), p.id)).collect();
  format!("📋 Products:\n\n{}", lines.join("\n\n"))
}

pub fn checkout(product: &Product, order: &Order) -> String {
  format!(
    "🧾 Order created\n\nProduct: {}\nAmount: {}\nOrder: {}\n\n\
     Tap 💳 Pay to complete the UPI payment, then tap ✅ I've paid.",
    product.name, order.amount, order.id
  )
}

pub fn order_state_label(state: OrderState) -> &'static str {
  match state {
    OrderState::Created | OrderState::Pending => "⏳ awaiting payment",
    OrderState::Paid => "✅ paid",
    OrderState::Provisioned => "🎟️ access granted",
    OrderState::Failed => "❌ failed",
    OrderState::Expired => "⌛ expired",
  }
}

pub fn order_listing(orders: &[Order]) -> String {
  if orders.is_empty() {
    return NO_ORDERS.to_string();
  }
  let lines: Vec<String> = orders
    .iter()
    .map(|o| {
      format!(
        "• {} · {} · {}\n  {}",
        o.product_id,
        o.amount,
        order_state_label(o.state),
        o.created_at.format("%Y-%m-%d %H:%M UTC")
      )
    })
    .collect();
  format!("🧾 Your orders:\n\n{}", lines.join("\n"))
}

pub fn stats(counts: &[(OrderState, u64)], products: usize) -> String {
  let lines: Vec<String> = counts
    .iter()
    .map(|(state, n)| format!("{}: {}", state.as_str(), n))
    .collect();
  format!("📊 Stats\n\nProducts: {}\n\nOrders:\n{}", products, lines.join("\n"))
}

pub const AWAITING_PAYMENT: &str = "⏳ Payment not received yet. If you have paid, it will be confirmed automatically in a moment.";
pub const PAYMENT_FAILED: &str = "❌ This payment failed. Send /start to place a new order.";
pub const ORDER_EXPIRED: &str = "⌛ This order expired. Send /start to place a new order.";

pub fn broadcast_done(delivered: usize, recipients: usize) -> String {
  format!("📣 Broadcast sent to {} of {} buyers.", delivered, recipients)
}

pub fn bot_added(title: &str, chat_id: i64) -> String {
  format!("🤖 Bot added to group: {} (ID: {})", title, chat_id)
}

/// The reply for an engine error at the chat boundary.
pub fn user_error(err: &PaygateError) -> &'static str {
  match err {
    PaygateError::ProductNotFound(_) => "❌ Product not found.",
    PaygateError::OrderNotFound(_) => "❌ Order not found.",
    PaygateError::Gateway(_) => "❌ Payment could not be started. Please try again.",
    PaygateError::Unauthorized(_) => "❌ Unauthorized.",
    PaygateError::Delivery(_) => "⚠️ We could not send your invite right now. Tap ✅ I've paid again in a minute.",
    PaygateError::Validation(_) | PaygateError::MalformedPayload(_) | PaygateError::Storage { .. } => {
      "⚠️ Something went wrong. Please try again later."
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use paygate::{EntryStep, ProductId};

  #[test]
  fn entry_prompts_show_the_step_number() {
    assert_eq!(
      entry_reply(&EntryReply::Prompt(EntryStep::Price)),
      "Step 3/4: 💰 Enter product price (e.g., 99.99):"
    );
    let reprompt = entry_reply(&EntryReply::Reprompt {
      step: EntryStep::Image,
      reason: "❌ Please send a valid image.".to_string(),
    });
    assert!(reprompt.starts_with("❌ Please send a valid image."));
    assert!(reprompt.ends_with("Step 2/4: 🖼️ Please send the product image:"));
  }

  #[test]
  fn engine_errors_map_to_fixed_wording() {
    assert_eq!(
      user_error(&PaygateError::ProductNotFound(ProductId::new("prod_9"))),
      "❌ Product not found."
    );
    assert_eq!(
      user_error(&PaygateError::Gateway("timeout".to_string())),
      "❌ Payment could not be started. Please try again."
    );
    assert_eq!(user_error(&PaygateError::Unauthorized("x".to_string())), "❌ Unauthorized.");
    // Internal detail never reaches the chat.
    let storage = user_error(&PaygateError::storage(anyhow::anyhow!("connection reset by 10.0.0.5")));
    assert!(!storage.contains("10.0.0.5"));
  }

  #[test]
  fn empty_listings_have_friendly_text() {
    assert_eq!(catalog_listing(&[]), EMPTY_CATALOG);
    assert_eq!(order_listing(&[]), NO_ORDERS);
  }

  #[test]
  fn stats_lists_every_state() {
    let text = stats(&[(OrderState::Created, 2), (OrderState::Provisioned, 5)], 3);
    assert!(text.contains("Products: 3"));
    assert!(text.contains("created: 2"));
    assert!(text.contains("provisioned: 5"));
  }
}
