use crate::error::PdcError;

/// The authenticated caller of a write request; recorded as changeset author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub actor_id: String,
}

impl Principal {
    /// Construct from validated JWT claims at the server boundary.
    /// Core logic never reads raw tokens.
    pub fn from_jwt_claims(claims: &JwtClaims) -> Result<Self, PdcError> {
        let actor_id = claims
            .sub
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PdcError::Unauthorized("missing sub claim".into()))?;
        Ok(Self {
            actor_id: actor_id.to_string(),
        })
    }

    /// Construct explicitly for in-process callers and tests.
    pub fn in_process(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
        }
    }
}

/// JWT claims shape expected from the identity provider.
#[derive(Debug, serde::Deserialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    pub exp: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_from_claims() {
        let claims = JwtClaims {
            sub: Some("alice".into()),
            exp: None,
        };
        assert_eq!(
            Principal::from_jwt_claims(&claims).unwrap().actor_id,
            "alice"
        );
    }

    #[test]
    fn blank_sub_is_rejected() {
        let claims = JwtClaims {
            sub: Some("  ".into()),
            exp: None,
        };
        assert!(matches!(
            Principal::from_jwt_claims(&claims),
            Err(PdcError::Unauthorized(_))
        ));
    }
}
