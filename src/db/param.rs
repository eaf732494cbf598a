use aws_sdk_rdsdata::types::{Field, SqlParameter, TypeHint};
use serde::Serialize;

/// Typed value carried by a named statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    Text(String),
}

/// A named, typed parameter for the data API.
///
/// JSON payloads travel as text tagged with a type hint so the server casts
/// them into the jsonb column type.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    pub name: String,
    pub value: ParamValue,
    pub json: bool,
}

impl SqlParam {
    fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
            json: false,
        }
    }

    pub fn null(name: impl Into<String>) -> Self {
        Self::new(name, ParamValue::Null)
    }

    pub fn bool(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, ParamValue::Bool(value))
    }

    pub fn long(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, ParamValue::Long(value))
    }

    pub fn double(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, ParamValue::Double(value))
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ParamValue::Text(value.into()))
    }

    /// Text parameter from an optional value; `None` becomes a NULL parameter.
    pub fn opt_text(name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => Self::text(name, v),
            None => Self::null(name),
        }
    }

    /// Long parameter from an optional value; `None` becomes a NULL parameter.
    pub fn opt_long(name: impl Into<String>, value: Option<i64>) -> Self {
        match value {
            Some(v) => Self::long(name, v),
            None => Self::null(name),
        }
    }

    /// Serialize any value to JSON text and tag it for server-side jsonb cast.
    /// `None` becomes a plain NULL parameter.
    pub fn json<T: Serialize>(name: impl Into<String>, value: Option<&T>) -> Self {
        match value {
            Some(v) => {
                let text = serde_json::to_string(v).unwrap_or_else(|_| "null".to_string());
                Self {
                    name: name.into(),
                    value: ParamValue::Text(text),
                    json: true,
                }
            }
            None => Self::null(name),
        }
    }

    /// Convert into the data API wire representation.
    pub fn into_wire(self) -> SqlParameter {
        let field = match self.value {
            ParamValue::Null => Field::IsNull(true),
            ParamValue::Bool(v) => Field::BooleanValue(v),
            ParamValue::Long(v) => Field::LongValue(v),
            ParamValue::Double(v) => Field::DoubleValue(v),
            ParamValue::Text(v) => Field::StringValue(v),
        };

        let builder = SqlParameter::builder().name(self.name).value(field);
        let builder = if self.json {
            builder.type_hint(TypeHint::Json)
        } else {
            builder
        };
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_dispatch() {
        assert_eq!(SqlParam::long("priority", 2).value, ParamValue::Long(2));
        assert_eq!(
            SqlParam::double("overall", 3.8).value,
            ParamValue::Double(3.8)
        );
        assert_eq!(SqlParam::bool("flag", true).value, ParamValue::Bool(true));
        assert_eq!(
            SqlParam::text("status", "draft").value,
            ParamValue::Text("draft".to_string())
        );
        assert_eq!(SqlParam::null("notes").value, ParamValue::Null);
    }

    #[test]
    fn test_optional_values_become_null() {
        assert_eq!(
            SqlParam::opt_text("notes", None::<String>).value,
            ParamValue::Null
        );
        assert_eq!(SqlParam::opt_long("component", None).value, ParamValue::Null);
        assert_eq!(
            SqlParam::json::<serde_json::Value>("meta", None).value,
            ParamValue::Null
        );
    }

    #[test]
    fn test_json_serializes_and_tags() {
        let param = SqlParam::json("config", Some(&json!({"actions": {}})));
        assert!(param.json);
        assert_eq!(
            param.value,
            ParamValue::Text(r#"{"actions":{}}"#.to_string())
        );

        // Plain text is never tagged
        let param = SqlParam::text("title", "x");
        assert!(!param.json);
    }
}
