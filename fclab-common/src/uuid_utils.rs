//! UUID utilities

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a stored GUID column, reporting corruption as an internal error
pub fn parse_stored(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Invalid stored GUID '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_parse_stored() {
        let id = generate();
        assert_eq!(parse_stored(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_parse_stored_rejects_garbage() {
        assert!(matches!(parse_stored("not-a-guid"), Err(Error::Internal(_))));
    }
}
