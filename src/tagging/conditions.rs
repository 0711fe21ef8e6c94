use std::str::FromStr;

use anyhow::bail;

/// Document field a condition reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionField {
    Name,
    Content,
}

impl ConditionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Content => "content",
        }
    }
}

impl FromStr for ConditionField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "name" => Ok(Self::Name),
            "content" => Ok(Self::Content),
            other => bail!("unknown condition field '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "equal" => Ok(Self::Equal),
            "not_equal" => Ok(Self::NotEqual),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            other => bail!("unknown condition operator '{other}'"),
        }
    }
}

type Validator = fn(&str, &str) -> bool;

fn equal(field: &str, value: &str) -> bool {
    field == value
}

fn not_equal(field: &str, value: &str) -> bool {
    field != value
}

fn contains(field: &str, value: &str) -> bool {
    field.contains(value)
}

fn not_contains(field: &str, value: &str) -> bool {
    !field.contains(value)
}

fn starts_with(field: &str, value: &str) -> bool {
    field.starts_with(value)
}

fn ends_with(field: &str, value: &str) -> bool {
    field.ends_with(value)
}

/// Operator registry: adding an operator means adding one entry here (plus
/// the enum variant), not branching at call sites.
const VALIDATORS: &[(ConditionOperator, Validator)] = &[
    (ConditionOperator::Equal, equal),
    (ConditionOperator::NotEqual, not_equal),
    (ConditionOperator::Contains, contains),
    (ConditionOperator::NotContains, not_contains),
    (ConditionOperator::StartsWith, starts_with),
    (ConditionOperator::EndsWith, ends_with),
];

fn validator_for(operator: ConditionOperator) -> Validator {
    VALIDATORS
        .iter()
        .find(|(candidate, _)| *candidate == operator)
        .map(|(_, validator)| *validator)
        .unwrap_or(|_, _| false)
}

/// Evaluates one condition. When the condition is case-insensitive, both
/// sides are lower-cased before comparison.
pub fn condition_matches(
    field_value: &str,
    operator: ConditionOperator,
    condition_value: &str,
    case_sensitive: bool,
) -> bool {
    let validate = validator_for(operator);
    if case_sensitive {
        validate(field_value, condition_value)
    } else {
        validate(&field_value.to_lowercase(), &condition_value.to_lowercase())
    }
}
