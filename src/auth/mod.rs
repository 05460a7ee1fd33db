pub mod jwt;

pub use jwt::{authorize_tenant, permissions_for_roles, require_permission, AuthConfig, Claims, Permission};
