//! Login redirect construction.

use strum::{Display, IntoStaticStr};

use crate::config::PlaydeckConfig;

/// `response_type` sent to the authorize endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ResponseType {
    /// Implicit grant: the access token comes back in the redirect fragment.
    #[default]
    Token,
    /// Authorization-code grant: exchange the code through the token proxy.
    Code,
}

/// Parameters of an authorize redirect.
///
/// # Example
/// ```
/// use playdeck::auth::AuthorizeRequest;
/// use playdeck::config::PlaydeckConfig;
///
/// let config = PlaydeckConfig { client_id: "abc".into(), ..PlaydeckConfig::default() };
/// let url = AuthorizeRequest::from_config(&config).url();
/// assert!(url.starts_with("https://accounts.spotify.com/authorize?response_type=token&client_id=abc"));
/// ```
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub authorize_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub response_type: ResponseType,
    pub state: Option<String>,
}

impl AuthorizeRequest {
    pub fn from_config(config: &PlaydeckConfig) -> Self {
        Self {
            authorize_url: config.authorize_url(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            response_type: ResponseType::Token,
            state: None,
        }
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Attach a random `state` value the callback must echo back.
    pub fn with_random_state(mut self) -> Self {
        self.state = Some(uuid::Uuid::new_v4().simple().to_string());
        self
    }

    pub fn url(&self) -> String {
        let scope = self.scopes.join(" ");
        let response_type: &'static str = self.response_type.into();
        let mut params = vec![
            ("response_type", response_type),
            ("client_id", self.client_id.as_str()),
            ("scope", scope.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        if let Some(state) = &self.state {
            params.push(("state", state.as_str()));
        }
        build_url_with_params(&self.authorize_url, &params)
    }
}

fn build_url_with_params(base: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoded(key), urlencoded(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

fn urlencoded(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request() -> AuthorizeRequest {
        AuthorizeRequest {
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            client_id: "client".to_string(),
            redirect_uri: "http://localhost:3000/".to_string(),
            scopes: vec!["user-read-private".to_string(), "user-read-email".to_string()],
            response_type: ResponseType::Token,
            state: None,
        }
    }

    #[test]
    fn implicit_grant_url_encodes_scopes_and_redirect() {
        assert_eq!(
            request().url(),
            "https://accounts.spotify.com/authorize?response_type=token&client_id=client\
             &scope=user-read-private%20user-read-email\
             &redirect_uri=http%3A%2F%2Flocalhost%3A3000%2F"
        );
    }

    #[test]
    fn code_flow_with_state_appends_state() {
        let req = request()
            .with_response_type(ResponseType::Code)
            .with_random_state();
        let state = req.state.clone().unwrap();
        let url = req.url();
        assert!(url.contains("response_type=code"));
        assert!(url.ends_with(&format!("&state={state}")));
        assert_eq!(state.len(), 32);
    }
}
