//! Injected caller identity
//!
//! The original front end read identity and permissions from ambient
//! browser storage at arbitrary times. Here the current identity is an
//! explicit value handed to the core's constructors: consumers decide
//! what a "session" is, the core only reads it.

/// Permission required to receive admin order alerts
pub const PERM_MANAGE_ORDERS: &str = "manage_orders";

/// Identity and permissions of the connected user
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Customer phone number, if the user is a customer
    pub customer_phone: Option<String>,

    /// Granted permission names (staff/admin users)
    pub permissions: Vec<String>,
}

impl Session {
    /// Session for a customer identified by phone number
    pub fn customer(phone: impl Into<String>) -> Self {
        Self {
            customer_phone: Some(phone.into()),
            permissions: Vec::new(),
        }
    }

    /// Session for a staff member with the given permissions
    pub fn staff(permissions: Vec<String>) -> Self {
        Self {
            customer_phone: None,
            permissions,
        }
    }

    /// Anonymous session (no identity, no permissions)
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_lookup() {
        let session = Session::staff(vec![PERM_MANAGE_ORDERS.to_string()]);
        assert!(session.has_permission(PERM_MANAGE_ORDERS));
        assert!(!session.has_permission("manage_tables"));
        assert!(session.customer_phone.is_none());
    }

    #[test]
    fn test_customer_session() {
        let session = Session::customer("0900000001");
        assert_eq!(session.customer_phone.as_deref(), Some("0900000001"));
        assert!(!session.has_permission(PERM_MANAGE_ORDERS));
    }
}
