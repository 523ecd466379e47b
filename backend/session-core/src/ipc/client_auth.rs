/// Per-connection authentication state.
pub(crate) struct ClientAuth {
    authenticated: bool,
    expected_token: String,
}

impl ClientAuth {
    pub(crate) fn new(token: String) -> Self {
        Self {
            authenticated: false,
            expected_token: token,
        }
    }

    /// Returns true and marks the connection authenticated if `token` matches.
    pub(crate) fn validate_token(&mut self, token: &str) -> bool {
        if !token.is_empty() && token == self.expected_token {
            self.authenticated = true;
        }
        self.authenticated
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
