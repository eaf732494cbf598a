use super::SqlParam;

/// Dynamic SELECT builder shared by every entity get tool.
///
/// Only the filters a caller actually supplies contribute conditions; the
/// conditions are ANDed, an omitted filter imposes no constraint, and every
/// statement ends with a deterministic ORDER BY and a parameterized LIMIT.
#[derive(Debug)]
pub struct SelectBuilder {
    base: String,
    conditions: Vec<String>,
    params: Vec<SqlParam>,
}

impl SelectBuilder {
    pub fn new(base_sql: impl Into<String>) -> Self {
        Self {
            base: base_sql.into(),
            conditions: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Add one conjunctive condition with its parameters.
    pub fn filter(mut self, condition: impl Into<String>, params: Vec<SqlParam>) -> Self {
        self.conditions.push(condition.into());
        self.params.extend(params);
        self
    }

    /// Add an `IN (...)` membership condition with one placeholder per value.
    pub fn filter_in(mut self, column: &str, prefix: &str, values: &[i64]) -> Self {
        if values.is_empty() {
            return self;
        }
        let placeholders: Vec<String> = (0..values.len())
            .map(|i| format!(":{prefix}_{i}"))
            .collect();
        self.conditions
            .push(format!("{} IN ({})", column, placeholders.join(",")));
        for (i, value) in values.iter().enumerate() {
            self.params.push(SqlParam::long(format!("{prefix}_{i}"), *value));
        }
        self
    }

    /// Finalize with an ORDER BY clause and a named LIMIT parameter.
    pub fn finish(
        mut self,
        order_by: &str,
        limit_param: &str,
        limit: i64,
    ) -> (String, Vec<SqlParam>) {
        let mut sql = self.base;
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY {order_by} LIMIT :{limit_param}"));
        self.params.push(SqlParam::long(limit_param, limit));
        (sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ParamValue;

    #[test]
    fn test_no_filters_means_no_where_clause() {
        let (sql, params) =
            SelectBuilder::new("SELECT id FROM hypothesis").finish("id ASC", "limit", 50);
        assert_eq!(
            sql,
            "SELECT id FROM hypothesis ORDER BY id ASC LIMIT :limit"
        );
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "limit");
        assert_eq!(params[0].value, ParamValue::Long(50));
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let (sql, params) = SelectBuilder::new("SELECT id FROM experiment e")
            .filter("e.status = :status", vec![SqlParam::text("status", "draft")])
            .filter(
                "e.hypothesis_id = :hypothesis_id",
                vec![SqlParam::long("hypothesis_id", 3)],
            )
            .finish("e.created_at DESC", "limit", 10);
        assert!(sql.contains(
            "WHERE e.status = :status AND e.hypothesis_id = :hypothesis_id"
        ));
        assert!(sql.ends_with("ORDER BY e.created_at DESC LIMIT :limit"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_in_list_placeholders() {
        let (sql, params) = SelectBuilder::new("SELECT id FROM hypothesis h")
            .filter_in("h.id", "id", &[4, 9])
            .finish("h.id ASC", "limit", 50);
        assert!(sql.contains("h.id IN (:id_0,:id_1)"));
        assert_eq!(params[0].value, ParamValue::Long(4));
        assert_eq!(params[1].value, ParamValue::Long(9));
    }

    #[test]
    fn test_empty_in_list_adds_no_condition() {
        let (sql, _) = SelectBuilder::new("SELECT id FROM hypothesis h")
            .filter_in("h.id", "id", &[])
            .finish("h.id ASC", "limit", 50);
        assert!(!sql.contains("WHERE"));
    }
}
