pub mod auth_service;
pub mod cart_service;
pub mod delivery_service;
pub mod order_service;
pub mod product_service;
pub mod report_service;
pub mod review_service;
pub mod user_service;
