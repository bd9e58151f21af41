// paygate/src/domain/mod.rs

//! Plain data: identifiers, money, products, orders and invitations.

pub mod ids;
pub mod invitation;
pub mod money;
pub mod order;
pub mod product;
