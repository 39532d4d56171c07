pub mod cart_items;
pub mod deliveries;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod role_requests;
pub mod sales;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use deliveries::Entity as Deliveries;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use role_requests::Entity as RoleRequests;
pub use sales::Entity as Sales;
pub use users::Entity as Users;
