use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Anything carrying a Keystone display name.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "ApplicationId", default)]
    pub application_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "ConditionalExpression", default)]
    pub conditional_expression: Option<Value>,
    #[serde(rename = "DynamicAssignmentId", default)]
    pub dynamic_assignment_id: Option<Value>,
    #[serde(rename = "RoleFunctionalAbilities", default)]
    pub role_functional_abilities: Option<Value>,
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "LastUpdate", default)]
    pub last_update: Option<String>,
}

impl Role {
    /// Functional abilities attached to the role. Entries may be the ability
    /// itself or a link object wrapping it under `FunctionalAbility`; anything
    /// that cannot be read as an ability is left out.
    pub fn functional_abilities(&self) -> Vec<FunctionalAbility> {
        let Some(Value::Array(items)) = &self.role_functional_abilities else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| {
                let candidate = item.get("FunctionalAbility").unwrap_or(item);
                serde_json::from_value(candidate.clone()).ok()
            })
            .collect()
    }
}

impl Named for Role {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "DynamicAssignmentId", default)]
    pub dynamic_assignment_id: Option<Value>,
    #[serde(rename = "LastUpdate", default)]
    pub last_update: Option<String>,
}

impl Named for Group {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalAbility {
    #[serde(rename = "ApplicationId", default)]
    pub application_id: String,
    #[serde(rename = "DataClassification", default)]
    pub data_classification: Option<i64>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "FunctionalAbilityEntityAccess", default)]
    pub entity_access: Option<Value>,
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "LastUpdate", default)]
    pub last_update: Option<String>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "SodRole", default)]
    pub sod_role: Option<String>,
}

impl Named for FunctionalAbility {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_decodes_with_nulls() {
        let role: Role = serde_json::from_value(json!({
            "ApplicationId": "app",
            "Name": "Analyst",
            "Description": null,
            "ConditionalExpression": null,
            "DynamicAssignmentId": null,
            "Id": "r1",
            "LastUpdate": "2024-01-01T00:00:00"
        }))
        .unwrap();
        assert_eq!(role.name, "Analyst");
        assert!(role.description.is_none());
        assert!(role.functional_abilities().is_empty());
    }

    #[test]
    fn group_requires_name() {
        let res: Result<Group, _> = serde_json::from_value(json!({"Id": "g1"}));
        assert!(res.is_err());
    }

    #[test]
    fn functional_abilities_plain_and_wrapped() {
        let role: Role = serde_json::from_value(json!({
            "Name": "Analyst",
            "RoleFunctionalAbilities": [
                {"Name": "Read Reports", "Id": "fa1"},
                {"FunctionalAbility": {"Name": "Export", "DataClassification": 2}},
                {"Unrelated": true}
            ]
        }))
        .unwrap();

        let names: Vec<_> = role
            .functional_abilities()
            .into_iter()
            .map(|fa| fa.name)
            .collect();
        assert_eq!(names, vec!["Read Reports", "Export"]);
    }
}
