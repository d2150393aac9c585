pub mod brand;
pub mod product;
pub mod user;

pub use brand::{Brand, BrandChanges, NewBrand};
pub use product::{NewProduct, Product, ProductChanges};
pub use user::{NewUser, User, UserChanges};
