use keyring::Entry;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::token::TokenClaims;
use crate::config::ClientConfig;
use crate::error::D1Error;

/// Keyring service name under which profiles are stored.
const KEYRING_SERVICE: &str = "dataone";

/// A named pairing of a coordinating node and a token, kept in the system
/// keyring so tokens never have to live in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProfile {
    name: String,
    cn_url: String,
    token: String,
}

impl AuthProfile {
    /// Creates a profile, checking that the URL parses and the token is a
    /// decodable JWT.
    pub fn new(
        name: impl Into<String>,
        cn_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, D1Error> {
        let cn_url = cn_url.into();
        let token = token.into();

        Url::parse(&cn_url)?;
        TokenClaims::decode(&token)?;

        Ok(AuthProfile {
            name: name.into(),
            cn_url,
            token,
        })
    }

    /// Stores the profile as a JSON secret under its name.
    pub fn set_to_keyring(&self) -> Result<(), D1Error> {
        Self::entry(&self.name)?
            .set_password(&self.to_secret()?)
            .map_err(|e| D1Error::client_side("Could not write to the keyring", Some(e)))
    }

    pub fn get_from_keyring(name: &str) -> Result<Self, D1Error> {
        let secret = Self::entry(name)?.get_password().map_err(|e| {
            D1Error::client_side(format!("No profile named {name} in the keyring"), Some(e))
        })?;
        Self::from_secret(&secret)
    }

    pub fn delete_from_keyring(name: &str) -> Result<(), D1Error> {
        Self::entry(name)?
            .delete_password()
            .map_err(|e| D1Error::client_side("Could not delete from the keyring", Some(e)))
    }

    fn entry(name: &str) -> Result<Entry, D1Error> {
        Entry::new(KEYRING_SERVICE, name)
            .map_err(|e| D1Error::client_side("Could not open the keyring", Some(e)))
    }

    fn to_secret(&self) -> Result<String, D1Error> {
        serde_json::to_string(self)
            .map_err(|e| D1Error::client_side("Could not encode profile", Some(e)))
    }

    fn from_secret(secret: &str) -> Result<Self, D1Error> {
        serde_json::from_str(secret)
            .map_err(|e| D1Error::client_side("Keyring entry is not a profile", Some(e)))
    }

    /// Points a configuration at this profile's CN and token.
    pub fn apply_to(&self, mut config: ClientConfig) -> ClientConfig {
        config.cn_url = self.cn_url.clone();
        config.auth_token = Some(self.token.clone());
        config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cn_url(&self) -> &str {
        &self.cn_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}
