//! Command types and their handlers, one handler per operation.

pub mod cart;
pub mod catalog;
pub mod identity;
pub mod orders;

pub use cart::{
    AddCartItem, AddCartItemHandler, AssignCartToUser, AssignCartToUserHandler, ClearCart,
    ClearCartHandler, CreateCart, CreateCartHandler, RemoveCartItem, RemoveCartItemHandler,
    UpdateCartItemQuantity, UpdateCartItemQuantityHandler,
};
pub use catalog::{
    AddVariant, AddVariantHandler, AdjustStock, AdjustStockHandler, AssignProductCategory,
    AssignProductCategoryHandler, ChangeProductPrice, ChangeProductPriceHandler, CreateAttribute,
    CreateAttributeHandler, CreateCategory, CreateCategoryHandler, CreateProduct,
    CreateProductHandler, MoveCategory, MoveCategoryHandler, RemoveProductCategory,
    RemoveProductCategoryHandler, SetProductStatus, SetProductStatusHandler, UpdateProductDetails,
    UpdateProductDetailsHandler, UpdateVariantPrice, UpdateVariantPriceHandler,
};
pub use identity::{
    AddUserAddress, AddUserAddressHandler, ChangeUserEmail, ChangeUserEmailHandler,
    ChangeUserPassword, ChangeUserPasswordHandler, ChangeUserRole, ChangeUserRoleHandler,
    RecordLogin, RecordLoginHandler, RegisterUser, RegisterUserHandler, RemoveUserAddress,
    RemoveUserAddressHandler, SetDefaultUserAddress, SetDefaultUserAddressHandler, UnlockUser,
    UnlockUserHandler, UpdateUserProfile, UpdateUserProfileHandler, VerifyEmail,
    VerifyEmailHandler,
};
pub use orders::{
    CancelOrder, CancelOrderHandler, DeliverOrder, DeliverOrderHandler, MarkOrderPaid,
    MarkOrderPaidHandler, PlaceOrder, PlaceOrderHandler, RefundOrder, RefundOrderHandler,
    ShipOrder, ShipOrderHandler,
};
