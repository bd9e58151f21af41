// paygate/server/src/bot/commands.rs

//! Parsing of slash commands and inline button payloads.

use paygate::{OrderId, ProductId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Start,
  AddProduct,
  /// `/replace_product <id>`; `None` when the id was left out.
  ReplaceProduct(Option<ProductId>),
  Cancel,
  Products,
  Orders,
  Stats,
  /// `/broadcast <text>`; `None` when there is no text.
  Broadcast(Option<String>),
  Unknown(String),
}

impl Command {
  /// Returns `None` for text that is not a command at all.
  pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (head, arg) = match rest.split_once(char::is_whitespace) {
      Some((head, arg)) => (head, arg.trim()),
      None => (rest, ""),
    };
    // Group chats address commands as `/start@SomeBot`.
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();

    let command = match name.as_str() {
      "start" => Command::Start,
      "add_product" => Command::AddProduct,
      "replace_product" => {
        let id = arg.split_whitespace().next().map(ProductId::new);
        Command::ReplaceProduct(id)
      }
      "cancel" => Command::Cancel,
      "products" => Command::Products,
      "orders" => Command::Orders,
      "stats" => Command::Stats,
      "broadcast" => Command::Broadcast((!arg.is_empty()).then(|| arg.to_string())),
      _ => Command::Unknown(name),
    };
    Some(command)
  }
}

/// What an inline button press asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
  Buy(ProductId),
  Verify(OrderId),
}

impl CallbackAction {
  pub fn parse(data: &str) -> Option<CallbackAction> {
    let (kind, value) = data.split_once(':')?;
    if value.is_empty() {
      return None;
    }
    match kind {
      "buy" => Some(CallbackAction::Buy(ProductId::new(value))),
      "verify" => OrderId::parse(value).map(CallbackAction::Verify),
      _ => None,
    }
  }

  pub fn encode(&self) -> String {
    match self {
      CallbackAction::Buy(product_id) => format!("buy:{}", product_id),
      CallbackAction::Verify(order_id) => format!("verify:{}", order_id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_commands_with_bot_suffix_and_arguments() {
    assert_eq!(Command::parse("/start"), Some(Command::Start));
    assert_eq!(Command::parse("/start@PaygateBot"), Some(Command::Start));
    assert_eq!(Command::parse("  /Add_Product "), Some(Command::AddProduct));
    assert_eq!(
      Command::parse("/replace_product prod_3"),
      Some(Command::ReplaceProduct(Some(ProductId::new("prod_3"))))
    );
    assert_eq!(Command::parse("/replace_product"), Some(Command::ReplaceProduct(None)));
    assert_eq!(Command::parse("/refund"), Some(Command::Unknown("refund".to_string())));
    assert_eq!(Command::parse("UTR 1234567890"), None);
  }

  #[test]
  fn broadcast_keeps_the_text_as_written() {
    assert_eq!(
      Command::parse("/broadcast  New drop tonight!\nSee /products "),
      Some(Command::Broadcast(Some("New drop tonight!\nSee /products".to_string())))
    );
    assert_eq!(Command::parse("/broadcast   "), Some(Command::Broadcast(None)));
  }

  #[test]
  fn callback_payloads_survive_encoding() {
    let order_id = OrderId::generate();
    let verify = CallbackAction::Verify(order_id);
    assert_eq!(CallbackAction::parse(&verify.encode()), Some(verify));
    assert_eq!(
      CallbackAction::parse("buy:prod_1"),
      Some(CallbackAction::Buy(ProductId::new("prod_1")))
    );
  }

  #[test]
  fn rejects_unknown_or_broken_callbacks() {
    assert_eq!(CallbackAction::parse("buy:"), None);
    assert_eq!(CallbackAction::parse("verify:not-a-uuid"), None);
    assert_eq!(CallbackAction::parse("refund:prod_1"), None);
    assert_eq!(CallbackAction::parse("garbage"), None);
  }
}
