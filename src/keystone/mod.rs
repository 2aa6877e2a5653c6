pub mod filter;
pub mod types;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::security::auth::AccessToken;
use crate::transport::{ApiRequest, Transport};

pub use filter::MatchMode;
pub use types::{FunctionalAbility, Group, Named, Role};

pub const GROUP_ENDPOINT: &str = "adminservice/keystone/v1/group";

pub fn role_endpoint(application_id: &str) -> String {
    format!("adminservice/keystone/v1/application/{application_id}/role")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated(AccessToken),
}

/// Read-only Keystone admin queries for one application.
#[derive(Debug)]
pub struct KeystoneClient<T: Transport> {
    transport: T,
    config: Config,
    state: AuthState,
}

impl<T: Transport> KeystoneClient<T> {
    pub fn new(transport: T, config: Config) -> Self {
        Self {
            transport,
            config,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.state = AuthState::Authenticated(token);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn bearer(&self) -> Result<&str> {
        match &self.state {
            AuthState::Authenticated(token) => Ok(token.as_str()),
            AuthState::Unauthenticated => Err(Error::NotAuthenticated),
        }
    }

    /// Groups are stored as `<org prefix><name>`. The prefixed name drives the
    /// server-side filter and exact matching; contains mode matches the bare
    /// name. A name that already carries the prefix is not prefixed twice.
    /// Only the ends of `name` are trimmed.
    pub fn find_group(&self, name: &str, exact: bool) -> Result<Vec<Group>> {
        let bare = filter::strip_org_prefix(name, &self.config.org_prefix);
        let prefixed = filter::with_org_prefix(&bare, &self.config.org_prefix);

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("groupName", &prefixed)
            .finish();
        debug!(group = %prefixed, query = %query, "looking up group");

        let request = ApiRequest::get(GROUP_ENDPOINT)
            .with_query(query)
            .with_bearer(self.bearer()?);
        let groups: Vec<Group> = self.fetch_records(request)?;

        let mode = MatchMode::from_exact(exact);
        let target = match mode {
            MatchMode::Exact => prefixed.as_str(),
            MatchMode::Contains => bare.as_str(),
        };
        filter::filter_by_name(groups, target, mode)
    }

    /// Lists every role of the configured application and filters locally.
    pub fn find_role(&self, name: &str, exact: bool) -> Result<Vec<Role>> {
        let target = name.trim();
        let endpoint = role_endpoint(&self.config.application_id);
        debug!(role = %target, endpoint = %endpoint, "looking up role");

        let request = ApiRequest::get(endpoint).with_bearer(self.bearer()?);
        let roles: Vec<Role> = self.fetch_records(request)?;

        filter::filter_by_name(roles, target, MatchMode::from_exact(exact))
    }

    fn fetch_records<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<Vec<R>> {
        let endpoint = request.endpoint.clone();
        let resp = self.transport.request(request)?;
        if !resp.is_ok() {
            debug!(status = resp.status, body = %resp.text(), "keystone query rejected");
            return Err(Error::Query {
                endpoint,
                status: resp.status,
            });
        }
        decode_records(&resp.body)
    }
}

/// The body must be a JSON array of objects. Objects without a string `Name`
/// are skipped, as are objects whose other fields do not fit `R`.
pub fn decode_records<R: DeserializeOwned>(body: &[u8]) -> Result<Vec<R>> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| Error::decode("record listing", e))?;
    let Value::Array(items) = value else {
        return Err(Error::Decode("expected a JSON array of records".to_string()));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(map) = &item else {
            return Err(Error::Decode(format!("record {index} is not an object")));
        };
        if !matches!(map.get("Name"), Some(Value::String(_))) {
            debug!(index, "skipping record without a Name");
            continue;
        }
        match serde_json::from_value::<R>(item) {
            Ok(record) => records.push(record),
            Err(err) => warn!(index, error = %err, "skipping malformed record"),
        }
    }
    Ok(records)
}
