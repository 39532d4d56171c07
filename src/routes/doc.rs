use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        chatbot::ChatbotOrderSummary,
        deliveries::{DeliveryCounts, UpdateDeliveryStatusRequest},
        orders::{CheckoutRequest, OrderDetail, OrderList, UpdateOrderRequest},
        products::{CreateProductRequest, ProductList, ReviewList, UpdateProductRequest},
        reports::{
            CreateSaleRequest, DailySales, MonthlySales, ProductPerformance, ProductUnits,
            SaleList, SalesSummary, UpdateSaleRequest,
        },
        reviews::{SubmitReviewRequest, UpdateReviewRequest},
        users::{
            ProcessRoleRequest, RoleRequestList, RoleRequestView, SubmittedRoleRequest,
            UpdateProfileRequest, UserCount, UserList,
        },
    },
    models::{
        CartItem, Delivery, DeliveryStatus, Order, OrderItem, OrderStatus, Product, Review,
        RoleRequest, RoleRequestStatus, Sale, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        account, admin, auth, cart, chatbot, deliveries, health, orders, params,
        products as product_routes, reports, reviews,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::list_product_reviews,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::update_order,
        orders::cancel_order,
        orders::get_order_delivery,
        reviews::list_my_reviews,
        reviews::submit_review,
        reviews::update_review,
        reviews::delete_review,
        deliveries::delivery_counts,
        deliveries::get_delivery,
        deliveries::update_status,
        account::get_profile,
        account::update_profile,
        account::delete_account,
        account::submit_role_request,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_low_stock,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::list_users,
        admin::user_count,
        admin::pending_role_requests,
        admin::process_role_request,
        admin::list_all_reviews,
        admin::delete_review_admin,
        reports::sales_summary,
        reports::export_csv,
        reports::list_sales,
        reports::create_sale,
        reports::update_sale,
        reports::delete_sale,
        chatbot::orders_for_customer
    ),
    components(
        schemas(
            User,
            Product,
            CartItem,
            Order,
            OrderItem,
            Delivery,
            Review,
            Sale,
            RoleRequest,
            OrderStatus,
            DeliveryStatus,
            RoleRequestStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CheckoutRequest,
            UpdateOrderRequest,
            OrderDetail,
            OrderList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ReviewList,
            SubmitReviewRequest,
            UpdateReviewRequest,
            UpdateDeliveryStatusRequest,
            DeliveryCounts,
            UpdateProfileRequest,
            ProcessRoleRequest,
            RoleRequestView,
            RoleRequestList,
            UserList,
            UserCount,
            SubmittedRoleRequest,
            CreateSaleRequest,
            UpdateSaleRequest,
            SaleList,
            SalesSummary,
            DailySales,
            MonthlySales,
            ProductUnits,
            ProductPerformance,
            ChatbotOrderSummary,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<SalesSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Deliveries", description = "Delivery tracking endpoints"),
        (name = "Account", description = "Profile and role request endpoints"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Reports", description = "Sales reporting endpoints"),
        (name = "Chatbot", description = "Chatbot integration endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
