pub mod perfume;
pub mod role;
pub mod user;

pub use perfume::{Perfume, PerfumeChanges, PerfumeFields, PerfumeResponse};
pub use role::{Role, RoleResponse, ADMIN_ROLE_ID, CUSTOMER_ROLE_ID};
pub use user::{NewUser, User, UserChanges, UserResponse};
