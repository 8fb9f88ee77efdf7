pub use super::orders::Entity as Orders;
