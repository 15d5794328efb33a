// Record endpoints
//
// Bulk fetches by integer ID or string key, the baseline probe and
// resolver, location search, and record saves. Every method hands back
// the raw body; the caller decides how to parse it.

use bytes::Bytes;
use tracing::debug;

use crate::client::BaobabClient;
use crate::error::Error;

/// Plugin path of the baseline (catch-all) plugin.
pub const BASELINE_PATH: &str = "baseline";

/// Join integer IDs into the comma-separated path segment the server expects.
pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl BaobabClient {
    /// Fetch the baseline description (plugin list, server info).
    ///
    /// `GET /json/baseline`. Needs no authentication, which is what makes it
    /// usable as a liveness probe; credentials are sent when available.
    pub async fn baseline(&self) -> Result<Bytes, Error> {
        let mut url = self.endpoint_url(&["json", BASELINE_PATH])?;
        self.authenticate_if_possible(&mut url);
        debug!("probing baseline");
        self.get(url).await
    }

    /// Ask the baseline plugin which plugin owns each ID.
    ///
    /// `GET /json/baseline/handlers/<ids>?<credentials>`
    pub async fn resolve_handlers(&self, ids: &[i64]) -> Result<Bytes, Error> {
        let joined = join_ids(ids);
        let mut url = self.resource_url(&["json", BASELINE_PATH, "handlers"], &joined)?;
        self.authenticate(&mut url)?;
        debug!(count = ids.len(), "resolving handlers");
        self.get(url).await
    }

    /// Fetch records of one plugin by integer ID.
    ///
    /// `GET /json/<plugin>/<ids>?show_details&<credentials>`
    pub async fn fetch_by_ids(&self, plugin_path: &str, ids: &[i64]) -> Result<Bytes, Error> {
        let joined = join_ids(ids);
        let mut url = self.resource_url(&["json", plugin_path], &joined)?;
        url.query_pairs_mut().append_key_only("show_details");
        self.authenticate(&mut url)?;
        debug!(plugin_path, count = ids.len(), "fetching by id");
        self.get(url).await
    }

    /// Fetch things by their string key.
    ///
    /// `GET /json/things/<keys>?show_details&<credentials>`
    pub async fn fetch_things_by_key(&self, keys: &[String]) -> Result<Bytes, Error> {
        let joined = keys.join(",");
        let mut url = self.resource_url(&["json", "things"], &joined)?;
        url.query_pairs_mut().append_key_only("show_details");
        self.authenticate(&mut url)?;
        debug!(count = keys.len(), "fetching things by key");
        self.get(url).await
    }

    /// Fetch login records by their login name.
    ///
    /// `GET /json/people/logins/?login_ids=<names>&show_details&<credentials>`
    pub async fn fetch_logins_by_login_id(&self, login_ids: &[String]) -> Result<Bytes, Error> {
        let mut url = self.endpoint_url(&["json", "people/logins", ""])?;
        url.query_pairs_mut()
            .append_pair("login_ids", &login_ids.join(","))
            .append_key_only("show_details");
        self.authenticate(&mut url)?;
        debug!(count = login_ids.len(), "fetching logins by login id");
        self.get(url).await
    }

    /// Search one plugin for records within `radius_km` of a point.
    ///
    /// `GET /json/<plugin>/?search_latitude=..&search_longitude=..&search_radius=..`
    pub async fn search_by_location(
        &self,
        plugin_path: &str,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Bytes, Error> {
        let mut url = self.endpoint_url(&["json", plugin_path, ""])?;
        url.query_pairs_mut()
            .append_pair("search_latitude", &latitude.to_string())
            .append_pair("search_longitude", &longitude.to_string())
            .append_pair("search_radius", &radius_km.to_string())
            .append_key_only("show_details");
        self.authenticate(&mut url)?;
        debug!(plugin_path, latitude, longitude, radius_km, "location search");
        self.get(url).await
    }

    /// Send changed fields of an existing record.
    ///
    /// `PUT /json/<plugin>/<id>?<changes>&<credentials>`
    pub async fn put_record(
        &self,
        plugin_path: &str,
        id: i64,
        params: &[(String, String)],
    ) -> Result<Bytes, Error> {
        let mut url = self.resource_url(&["json", plugin_path], &id.to_string())?;
        url.query_pairs_mut().extend_pairs(params);
        self.authenticate(&mut url)?;
        debug!(plugin_path, id, fields = params.len(), "saving record");
        self.send_expect_success(reqwest::Method::PUT, url).await
    }

    /// Create a new record.
    ///
    /// `POST /json/<plugin>/?<fields>&<credentials>`
    pub async fn post_record(
        &self,
        plugin_path: &str,
        params: &[(String, String)],
    ) -> Result<Bytes, Error> {
        let mut url = self.endpoint_url(&["json", plugin_path, ""])?;
        url.query_pairs_mut().extend_pairs(params);
        self.authenticate(&mut url)?;
        debug!(plugin_path, fields = params.len(), "creating record");
        self.send_expect_success(reqwest::Method::POST, url).await
    }
}
