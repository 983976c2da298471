use crate::errors::StoreError;
use admission_core_types::{
    sort_by_priority, AccessRule, MatchPattern, MatchType, Prioritized, RecordId, UrlMapping,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One stored row, keyed by column name.
pub type Row = Map<String, Value>;

/// A record type persisted by a [`Repository`](crate::spi::Repository).
///
/// Column mapping is written out by hand per record type so the storage layout never depends
/// on struct field names.
pub trait Record: Prioritized + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn to_row(&self) -> Row;
    fn from_row(row: &Row) -> Result<Self, StoreError>;
    fn validate(&self) -> Result<(), StoreError>;
    fn assign_id(&mut self, id: RecordId);
    fn touch(&mut self, at: DateTime<Utc>);
}

const NAME_MAX: usize = 100;
const VALUE_MAX: usize = 500;

fn text(row: &Row, column: &str) -> Result<String, StoreError> {
    match row.get(column) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(StoreError::bad_request(&format!(
            "column {column} must be text, got {other}"
        ))),
        None => Err(StoreError::bad_request(&format!("missing column {column}"))),
    }
}

fn opt_text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(Value::as_str).map(str::to_string)
}

fn id_column(row: &Row) -> Result<RecordId, StoreError> {
    row.get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| StoreError::bad_request("missing or non-integer column id"))
}

fn priority_column(row: &Row) -> Result<i32, StoreError> {
    match row.get("priority") {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| StoreError::bad_request("column priority must be a 32-bit integer")),
    }
}

fn enabled_column(row: &Row) -> bool {
    row.get("enabled").and_then(Value::as_bool).unwrap_or(true)
}

fn time_column(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    opt_text(row, column)
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parsed<T>(row: &Row, column: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text(row, column)?
        .parse::<T>()
        .map_err(|err| StoreError::bad_request(&err.to_string()))
}

fn put_time(row: &mut Row, column: &str, value: Option<DateTime<Utc>>) {
    if let Some(at) = value {
        row.insert(column.into(), Value::String(at.to_rfc3339()));
    }
}

fn put_opt(row: &mut Row, column: &str, value: &Option<String>) {
    if let Some(text) = value {
        row.insert(column.into(), Value::String(text.clone()));
    }
}

fn check_len(column: &str, value: &str, max: usize) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::bad_request(&format!("{column} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(StoreError::bad_request(&format!(
            "{column} exceeds {max} characters"
        )));
    }
    Ok(())
}

impl Record for AccessRule {
    const TABLE: &'static str = "access_rules";

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::from(self.id));
        row.insert("rule_name".into(), Value::String(self.rule_name.clone()));
        row.insert("rule_type".into(), Value::String(self.rule_type.as_str().into()));
        row.insert("match_type".into(), Value::String(self.match_type.as_str().into()));
        row.insert(
            "match_pattern".into(),
            Value::String(self.match_pattern.as_str().into()),
        );
        row.insert("match_value".into(), Value::String(self.match_value.clone()));
        row.insert("priority".into(), Value::from(self.priority));
        row.insert("enabled".into(), Value::Bool(self.enabled));
        put_opt(&mut row, "description", &self.description);
        put_time(&mut row, "created_at", self.created_at);
        put_time(&mut row, "updated_at", self.updated_at);
        row
    }

    fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(AccessRule {
            id: id_column(row)?,
            rule_name: text(row, "rule_name")?,
            rule_type: parsed(row, "rule_type")?,
            match_type: parsed(row, "match_type")?,
            match_pattern: parsed(row, "match_pattern")?,
            match_value: text(row, "match_value")?,
            priority: priority_column(row)?,
            enabled: enabled_column(row),
            description: opt_text(row, "description"),
            created_at: time_column(row, "created_at"),
            updated_at: time_column(row, "updated_at"),
        })
    }

    fn validate(&self) -> Result<(), StoreError> {
        check_len("rule_name", &self.rule_name, NAME_MAX)?;
        check_len("match_value", &self.match_value, VALUE_MAX)?;
        if self.match_pattern == MatchPattern::Cidr && self.match_type != MatchType::Ip {
            return Err(StoreError::bad_request(
                "match_pattern cidr is only valid for match_type ip",
            ));
        }
        Ok(())
    }

    fn assign_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(at);
        }
        self.updated_at = Some(at);
    }
}

impl Record for UrlMapping {
    const TABLE: &'static str = "url_mappings";

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::from(self.id));
        row.insert("mapping_name".into(), Value::String(self.mapping_name.clone()));
        row.insert("external_path".into(), Value::String(self.external_path.clone()));
        row.insert("internal_path".into(), Value::String(self.internal_path.clone()));
        row.insert("target_service".into(), Value::String(self.target_service.clone()));
        row.insert(
            "mapping_type".into(),
            Value::String(self.mapping_type.as_str().into()),
        );
        row.insert("priority".into(), Value::from(self.priority));
        row.insert("enabled".into(), Value::Bool(self.enabled));
        put_opt(&mut row, "description", &self.description);
        put_time(&mut row, "created_at", self.created_at);
        put_time(&mut row, "updated_at", self.updated_at);
        row
    }

    fn from_row(row: &Row) -> Result<Self, StoreError> {
        let mapping_type = match row.get("mapping_type") {
            None | Some(Value::Null) => Default::default(),
            Some(_) => parsed(row, "mapping_type")?,
        };
        Ok(UrlMapping {
            id: id_column(row)?,
            mapping_name: text(row, "mapping_name")?,
            external_path: text(row, "external_path")?,
            internal_path: text(row, "internal_path")?,
            target_service: text(row, "target_service")?,
            mapping_type,
            priority: priority_column(row)?,
            enabled: enabled_column(row),
            description: opt_text(row, "description"),
            created_at: time_column(row, "created_at"),
            updated_at: time_column(row, "updated_at"),
        })
    }

    fn validate(&self) -> Result<(), StoreError> {
        check_len("mapping_name", &self.mapping_name, NAME_MAX)?;
        check_len("external_path", &self.external_path, VALUE_MAX)?;
        check_len("internal_path", &self.internal_path, VALUE_MAX)?;
        check_len("target_service", &self.target_service, NAME_MAX)?;
        let wild_ext = self.external_path.ends_with("/**");
        let wild_int = self.internal_path.ends_with("/**");
        if wild_int && !wild_ext {
            return Err(StoreError::bad_request(
                "internal_path ends in /** but external_path does not",
            ));
        }
        Ok(())
    }

    fn assign_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(at);
        }
        self.updated_at = Some(at);
    }
}

/// Decodes rows into records, skipping rows that do not map onto the record type.
pub fn decode_rows<'a, E, I>(rows: I) -> Vec<E>
where
    E: Record,
    I: IntoIterator<Item = &'a Row>,
{
    rows.into_iter()
        .filter_map(|row| match E::from_row(row) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(table = E::TABLE, row = ?row.get("id"), %err, "skipping unreadable row");
                None
            }
        })
        .collect()
}

/// Keeps enabled records, in evaluation order.
pub fn enabled_in_order<E: Record>(mut records: Vec<E>) -> Vec<E> {
    records.retain(|record| record.is_enabled());
    sort_by_priority(&mut records);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use admission_core_types::{MappingType, RuleType};
    use serde_json::json;

    #[test]
    fn access_rule_row_uses_column_names() {
        let rule = AccessRule::new(
            7,
            "office",
            RuleType::Whitelist,
            MatchType::Ip,
            MatchPattern::Cidr,
            "10.0.0.0/8",
        )
        .with_priority(50);
        let row = rule.to_row();
        assert_eq!(row["rule_type"], json!("whitelist"));
        assert_eq!(row["match_pattern"], json!("cidr"));
        assert_eq!(row["priority"], json!(50));

        let back = AccessRule::from_row(&row).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.match_value, "10.0.0.0/8");
        assert!(back.created_at.is_some());
    }

    #[test]
    fn unknown_enum_text_is_rejected() {
        let row: Row = serde_json::from_value(json!({
            "id": 1, "rule_name": "x", "rule_type": "graylist",
            "match_type": "path", "match_pattern": "exact", "match_value": "/x"
        }))
        .unwrap();
        assert!(AccessRule::from_row(&row).is_err());
        assert!(decode_rows::<AccessRule, _>([&row]).is_empty());
    }

    #[test]
    fn mapping_defaults_when_columns_absent() {
        let row: Row = serde_json::from_value(json!({
            "id": 3, "mapping_name": "legacy", "external_path": "/old/**",
            "internal_path": "/new/**", "target_service": "svc"
        }))
        .unwrap();
        let mapping = UrlMapping::from_row(&row).unwrap();
        assert_eq!(mapping.mapping_type, MappingType::Rewrite);
        assert!(mapping.enabled);
        assert_eq!(mapping.priority, 0);
    }

    #[test]
    fn cidr_only_valid_for_ip_rules() {
        let rule = AccessRule::new(
            1,
            "bad",
            RuleType::Blacklist,
            MatchType::Path,
            MatchPattern::Cidr,
            "10.0.0.0/8",
        );
        assert!(rule.validate().is_err());
    }
}
