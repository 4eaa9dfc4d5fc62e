use serde_json::{Map, Value};

use crate::auth::ActorType;
use crate::constants::{ROUTE_ACTOR_TYPE_KEY, ROUTE_ROLES_KEY};

/// Metadata attached to a navigable route
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteData(Map<String, Value>);

impl RouteData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles = roles.into_iter().map(|r| Value::String(r.into())).collect();
        self.0.insert(ROUTE_ROLES_KEY.to_string(), Value::Array(roles));
        self
    }

    #[must_use]
    pub fn with_actor_type(mut self, actor_type: ActorType) -> Self {
        self.0.insert(
            ROUTE_ACTOR_TYPE_KEY.to_string(),
            Value::String(actor_type.as_str().to_string()),
        );
        self
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Required roles; non-string entries are ignored
    pub fn roles(&self) -> Vec<String> {
        self.0
            .get(ROUTE_ROLES_KEY)
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Required actor type; unrecognized values read as absent
    pub fn actor_type(&self) -> Option<ActorType> {
        self.0
            .get(ROUTE_ACTOR_TYPE_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl From<Map<String, Value>> for RouteData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
