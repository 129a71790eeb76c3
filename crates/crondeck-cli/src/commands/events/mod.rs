pub mod add;
pub mod disable;
pub mod enable;
pub mod list;
pub mod load;
pub mod rm;
