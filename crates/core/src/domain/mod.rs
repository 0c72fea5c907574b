pub mod cart;
pub mod order;
pub mod price;
pub mod product;
