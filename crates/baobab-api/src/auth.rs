// Session authentication
//
// API-key login/logout and the two "who am I" lookups. A successful login
// stores the returned key in the client; every authenticated call after
// that carries it as a query parameter.

use bytes::Bytes;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::client::BaobabClient;
use crate::error::Error;

/// Plugin path of the login-info lookup.
pub const MY_LOGIN_INFO_PATH: &str = "people/logins";
/// Plugin path of the user-info lookup.
pub const MY_USER_INFO_PATH: &str = "people/people";

impl BaobabClient {
    /// Log in with a login ID and password.
    ///
    /// `GET /login?login_id=..&password=..` answers with the raw API key as
    /// the body. On success the key is stored in the client. A non-2xx
    /// answer is an [`Error::HttpStatus`]; an empty key is an
    /// [`Error::Authentication`].
    pub async fn login(&self, login_id: &str, password: &SecretString) -> Result<(), Error> {
        let mut url = self.endpoint_url(&["login"])?;
        url.query_pairs_mut()
            .append_pair("login_id", login_id)
            .append_pair("password", password.expose_secret());
        self.append_server_secret(&mut url);
        let path = url.path().to_owned();

        debug!(login_id, "logging in");

        let (status, body) = self.send(reqwest::Method::GET, url).await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "login rejected");
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: path,
                body,
            });
        }

        let key = String::from_utf8_lossy(&body).trim().to_owned();
        if key.is_empty() {
            return Err(Error::Authentication {
                message: "server returned an empty API key".into(),
            });
        }

        self.set_api_key(SecretString::from(key));
        debug!("login successful");
        Ok(())
    }

    /// End the current session.
    ///
    /// `GET /logout?<credentials>`; the server signals success with HTTP 205.
    /// The stored API key is dropped whatever the outcome.
    pub async fn logout(&self) -> Result<(), Error> {
        let mut url = self.endpoint_url(&["logout"])?;
        self.authenticate(&mut url)?;
        let path = url.path().to_owned();

        debug!("logging out");
        let result = self.send(reqwest::Method::GET, url).await;
        self.clear_api_key();

        let (status, body) = result?;
        if status == StatusCode::RESET_CONTENT {
            debug!("logout complete");
            Ok(())
        } else {
            warn!(status = status.as_u16(), "unexpected logout status");
            Err(Error::HttpStatus {
                status: status.as_u16(),
                url: path,
                body,
            })
        }
    }

    /// Fetch the logged-in user's own login record.
    ///
    /// `GET /json/people/logins/my_info?<credentials>`
    pub async fn my_login_info(&self) -> Result<Bytes, Error> {
        self.my_info(MY_LOGIN_INFO_PATH)
            .await?
            .ok_or_else(|| Error::Authentication {
                message: "server has no login record for this session".into(),
            })
    }

    /// Fetch the user record associated with the logged-in login.
    ///
    /// `GET /json/people/people/my_info?<credentials>`. Returns `None` when
    /// the server answers 400, meaning the login has no associated user.
    pub async fn my_user_info(&self) -> Result<Option<Bytes>, Error> {
        self.my_info(MY_USER_INFO_PATH).await
    }

    async fn my_info(&self, plugin_path: &str) -> Result<Option<Bytes>, Error> {
        let mut url = self.endpoint_url(&["json", plugin_path, "my_info"])?;
        self.authenticate(&mut url)?;
        let path = url.path().to_owned();

        let (status, body) = self.send(reqwest::Method::GET, url).await?;
        if status == StatusCode::BAD_REQUEST {
            debug!(plugin_path, "no associated record");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: path,
                body,
            });
        }
        Ok(Some(body))
    }
}
