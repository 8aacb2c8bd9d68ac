//! Local precondition check run before any authenticated call
//!
//! The gate only looks at the stored values; it never touches the network.

use super::types::{AuthError, AuthResult, CredentialSnapshot, SessionTicket};

/// Server URL and session ready for building an authenticated client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub server_url: String,
    pub session: SessionTicket,
}

/// Check that a server is configured and a full session is stored
///
/// A missing server URL wins over a missing session.
pub fn check(snapshot: &CredentialSnapshot) -> AuthResult<Authenticated> {
    if !snapshot.is_configured() {
        return Err(AuthError::NotConfigured);
    }
    let session = snapshot.session().ok_or(AuthError::NotAuthenticated)?;
    Ok(Authenticated {
        server_url: snapshot.server_url.clone(),
        session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(server_url: &str, ticket: &str, csrf_token: &str) -> CredentialSnapshot {
        CredentialSnapshot {
            server_url: server_url.into(),
            ticket: ticket.into(),
            csrf_token: csrf_token.into(),
            username: String::new(),
        }
    }

    #[test]
    fn test_empty_server_is_not_configured() {
        assert!(matches!(
            check(&snapshot("", "TICKET", "CSRF")),
            Err(AuthError::NotConfigured)
        ));
        assert!(matches!(
            check(&snapshot("", "", "")),
            Err(AuthError::NotConfigured)
        ));
    }

    #[test]
    fn test_either_half_missing_is_not_authenticated() {
        for (ticket, csrf) in [("", ""), ("TICKET", ""), ("", "CSRF")] {
            assert!(matches!(
                check(&snapshot("https://pve:8006", ticket, csrf)),
                Err(AuthError::NotAuthenticated)
            ));
        }
    }

    #[test]
    fn test_complete_state_passes() {
        let passed = check(&snapshot("https://pve:8006", "TICKET", "CSRF")).unwrap();
        assert_eq!(passed.server_url, "https://pve:8006");
        assert_eq!(passed.session.ticket, "TICKET");
        assert_eq!(passed.session.csrf_token, "CSRF");
    }
}
