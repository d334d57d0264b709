use chrono::Utc;

/// Token lifetime the client assumes; the login response does not carry one.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Bearer token plus the bookkeeping needed to decide when to log in again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub issued_at_millis: i64,
    pub expires_in_secs: i64,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            issued_at_millis: Utc::now().timestamp_millis(),
            expires_in_secs: DEFAULT_TOKEN_LIFETIME_SECS,
        }
    }

    /// Valid while `issued_at + expires_in` lies strictly in the future.
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        self.issued_at_millis + self.expires_in_secs * 1000 > now_millis
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now().timestamp_millis())
    }

    pub fn expires_at_millis(&self) -> i64 {
        self.issued_at_millis + self.expires_in_secs * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(issued: i64, expires: i64) -> Session {
        Session {
            access_token: "t".into(),
            issued_at_millis: issued,
            expires_in_secs: expires,
        }
    }

    #[test]
    fn valid_before_expiry() {
        let s = session(1_000, 10);
        assert!(s.is_valid_at(1_000));
        assert!(s.is_valid_at(10_999));
    }

    #[test]
    fn invalid_exactly_at_boundary() {
        let s = session(1_000, 10);
        assert!(!s.is_valid_at(11_000));
        assert!(!s.is_valid_at(50_000));
    }

    #[test]
    fn fresh_session_is_valid() {
        let s = Session::new("abc");
        assert!(s.is_valid());
        assert_eq!(s.expires_in_secs, DEFAULT_TOKEN_LIFETIME_SECS);
    }
}
