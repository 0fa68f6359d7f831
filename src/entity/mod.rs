pub mod categories;
pub mod products;
pub mod ratings;
pub mod reviews;
pub mod users;

pub use categories::Entity as Categories;
pub use products::Entity as Products;
pub use ratings::Entity as Ratings;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
