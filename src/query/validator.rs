//! Query Validator
//!
//! Turns an untrusted JSON query document into a `QueryPlan`.
//!
//! # Document Shape
//!
//! ```text
//! {
//!   "WHERE": <filter>,
//!   "OPTIONS": { "COLUMNS": [key...], "ORDER"?: key | { "dir": "UP"|"DOWN", "keys": [key...] } },
//!   "TRANSFORMATIONS"?: { "GROUP": [key...], "APPLY": [{ name: { TOKEN: key } }...] }
//! }
//!
//! <filter> := {} | {"AND"|"OR": [<filter>...]} | {"NOT": <filter>}
//!           | {"GT"|"LT"|"EQ": {"id_mfield": number}} | {"IS": {"id_sfield": pattern}}
//! ```
//!
//! Key order is part of the grammar (`WHERE` before `OPTIONS`, `COLUMNS`
//! before `ORDER`, `GROUP` before `APPLY`). Every dataset reference in the
//! document must name the same registered dataset.
//!
//! Every violation is reported as `QueryError::Validation`.

use serde_json::{Map, Value as JsonValue};
use std::collections::{HashSet, VecDeque};

use crate::dataset::{Field, FieldType, Kind, QualifiedField, SchemaRegistry, SEPARATOR};
use crate::query::ast::*;
use crate::query::error::{QueryError, QueryResult};

/// Validates query documents against a schema registry
pub struct QueryValidator<'r> {
    registry: &'r dyn SchemaRegistry,
}

impl<'r> QueryValidator<'r> {
    pub fn new(registry: &'r dyn SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Parse a JSON string, then validate it
    pub fn validate_str(&self, input: &str) -> QueryResult<QueryPlan> {
        let query: JsonValue = serde_json::from_str(input)
            .map_err(|e| QueryError::invalid(format!("Query is not valid JSON: {}", e)))?;
        self.validate(&query)
    }

    /// Validate a query document
    pub fn validate(&self, query: &JsonValue) -> QueryResult<QueryPlan> {
        let mut ctx = Context {
            registry: self.registry,
            binding: None,
        };
        let plan = ctx.query(query)?;

        tracing::debug!(
            dataset_id = %plan.dataset_id,
            filter_nodes = plan.filter.as_ref().map(|f| f.len()).unwrap_or(0),
            columns = plan.columns.len(),
            grouped = plan.transform.is_grouped(),
            "Validated query"
        );

        Ok(plan)
    }
}

/// A filter body whose children still need slots
enum Pending<'q> {
    Logic(LogicOp, Vec<&'q JsonValue>),
    Not(&'q JsonValue),
    Leaf(FilterNode),
}

/// Per-document state: the dataset every reference must agree on
struct Context<'r> {
    registry: &'r dyn SchemaRegistry,
    binding: Option<(String, Kind)>,
}

impl<'r> Context<'r> {
    fn query(&mut self, query: &JsonValue) -> QueryResult<QueryPlan> {
        let obj = as_object(query, "Query")?;
        expect_keys(
            obj,
            &[&["WHERE", "OPTIONS"], &["WHERE", "OPTIONS", "TRANSFORMATIONS"]],
            "Query",
        )?;

        let filter = self.filter_tree(&obj["WHERE"])?;

        let transform = match obj.get("TRANSFORMATIONS") {
            Some(body) => Some(self.transformations(body)?),
            None => None,
        };

        let (columns, order) = self.options(&obj["OPTIONS"], transform.as_ref())?;

        if let Some(spec) = &transform {
            check_column_set(&columns, spec)?;
        }

        let (dataset_id, kind) = self
            .binding
            .clone()
            .ok_or_else(|| QueryError::invalid("Query does not reference any dataset"))?;

        Ok(QueryPlan {
            dataset_id,
            kind,
            filter,
            columns,
            order,
            transform: transform.unwrap_or_default(),
        })
    }

    // ------------------------------------------------------------------
    // Dataset binding
    // ------------------------------------------------------------------

    /// Bind the document to a dataset id, or check it matches the bound one
    fn bind(&mut self, dataset_id: &str) -> QueryResult<Kind> {
        match &self.binding {
            Some((bound, kind)) if bound == dataset_id => Ok(*kind),
            Some((bound, _)) => Err(QueryError::invalid(format!(
                "Cannot query more than one dataset: '{}' and '{}'",
                bound, dataset_id
            ))),
            None => {
                let kind = self.registry.kind_of(dataset_id).ok_or_else(|| {
                    QueryError::invalid(format!("Referenced dataset '{}' not added yet", dataset_id))
                })?;
                self.binding = Some((dataset_id.to_string(), kind));
                Ok(kind)
            }
        }
    }

    /// Resolve a `datasetId_field` key to a field of the bound dataset
    fn resolve_field(&mut self, key: &str) -> QueryResult<Field> {
        let qualified = QualifiedField::parse(key)
            .ok_or_else(|| QueryError::invalid(format!("Invalid key '{}'", key)))?;
        let kind = self.bind(qualified.dataset_id)?;

        kind.field(qualified.field).ok_or_else(|| {
            QueryError::invalid(format!(
                "Invalid key '{}': {} datasets have no field '{}'",
                key, kind, qualified.field
            ))
        })
    }

    fn resolve_typed_field(&mut self, key: &str, expected: FieldType, op: &str) -> QueryResult<Field> {
        let field = self.resolve_field(key)?;
        if field.field_type() != expected {
            let wanted = match expected {
                FieldType::Numeric => "numeric",
                FieldType::Text => "string",
            };
            return Err(QueryError::invalid(format!(
                "Invalid key type in {}: '{}' is not a {} field",
                op, key, wanted
            )));
        }
        Ok(field)
    }

    // ------------------------------------------------------------------
    // WHERE
    // ------------------------------------------------------------------

    /// Build the filter tree breadth-first. Each child gets its slot when its
    /// parent is processed; slots are filled in the order they were handed out.
    fn filter_tree(&mut self, body: &JsonValue) -> QueryResult<Option<FilterTree>> {
        let obj = as_object(body, "WHERE")?;
        if obj.is_empty() {
            return Ok(None);
        }

        let mut nodes: Vec<FilterNode> = Vec::new();
        let mut queue: VecDeque<(NodeId, &JsonValue)> = VecDeque::new();
        let mut next_slot = 1;
        queue.push_back((NodeId(0), body));

        while let Some((slot, body)) = queue.pop_front() {
            debug_assert_eq!(slot.0, nodes.len());

            let mut reserve = |child| {
                let id = NodeId(next_slot);
                next_slot += 1;
                queue.push_back((id, child));
                id
            };

            let node = match self.filter_body(body)? {
                Pending::Leaf(node) => node,
                Pending::Logic(op, bodies) => FilterNode::Logic {
                    op,
                    children: bodies.into_iter().map(&mut reserve).collect(),
                },
                Pending::Not(child) => FilterNode::Not {
                    child: reserve(child),
                },
            };

            nodes.push(node);
        }

        Ok(Some(FilterTree::from_nodes(nodes)))
    }

    /// Validate one filter body without descending into its children
    fn filter_body<'q>(&mut self, body: &'q JsonValue) -> QueryResult<Pending<'q>> {
        let obj = as_object(body, "Filter")?;
        let (key, value) = single_entry(obj, "Filter")?;

        if let Some(op) = LogicOp::from_str(key) {
            let children = value
                .as_array()
                .ok_or_else(|| QueryError::invalid(format!("{} must be an array", op)))?;
            if children.is_empty() {
                return Err(QueryError::invalid(format!("{} must be a non-empty array", op)));
            }
            return Ok(Pending::Logic(op, children.iter().collect()));
        }

        if let Some(op) = CompareOp::from_str(key) {
            let (field_key, operand) = single_entry(as_object(value, key)?, key)?;
            let field = self.resolve_typed_field(field_key, FieldType::Numeric, key)?;
            let value = match operand {
                JsonValue::Number(n) => n.as_f64().ok_or_else(|| {
                    QueryError::invalid(format!("Invalid value type in {}, should be number", op))
                })?,
                _ => {
                    return Err(QueryError::invalid(format!(
                        "Invalid value type in {}, should be number",
                        op
                    )))
                }
            };
            return Ok(Pending::Leaf(FilterNode::Compare { op, field, value }));
        }

        match key.as_str() {
            "NOT" => {
                if !value.is_object() {
                    return Err(QueryError::invalid("NOT must be an object"));
                }
                Ok(Pending::Not(value))
            }
            "IS" => {
                let (field_key, operand) = single_entry(as_object(value, "IS")?, "IS")?;
                let field = self.resolve_typed_field(field_key, FieldType::Text, "IS")?;
                let raw = operand.as_str().ok_or_else(|| {
                    QueryError::invalid("Invalid value type in IS, should be string")
                })?;
                let pattern = Pattern::parse(raw).ok_or_else(|| {
                    QueryError::invalid(format!(
                        "Asterisks (*) can only be the first or last characters of input strings: '{}'",
                        raw
                    ))
                })?;
                Ok(Pending::Leaf(FilterNode::Match { field, pattern }))
            }
            other => Err(QueryError::invalid(format!("Invalid filter key: {}", other))),
        }
    }

    // ------------------------------------------------------------------
    // TRANSFORMATIONS
    // ------------------------------------------------------------------

    fn transformations(&mut self, body: &JsonValue) -> QueryResult<TransformSpec> {
        let obj = as_object(body, "TRANSFORMATIONS")?;
        expect_keys(obj, &[&["GROUP", "APPLY"]], "TRANSFORMATIONS")?;

        let group_keys = obj["GROUP"]
            .as_array()
            .ok_or_else(|| QueryError::invalid("GROUP must be an array"))?;
        if group_keys.is_empty() {
            return Err(QueryError::invalid("GROUP must be a non-empty array"));
        }

        let mut group = Vec::with_capacity(group_keys.len());
        for key in group_keys {
            let key = key
                .as_str()
                .ok_or_else(|| QueryError::invalid("GROUP keys must be strings"))?;
            group.push(self.resolve_field(key)?);
        }

        let rules = obj["APPLY"]
            .as_array()
            .ok_or_else(|| QueryError::invalid("APPLY must be an array"))?;

        let mut apply: Vec<ApplyRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            let rule = self.apply_rule(rule)?;

            let clashes_with_group = group.iter().any(|f| f.name() == rule.name);
            let clashes_with_apply = apply.iter().any(|r| r.name == rule.name);
            if clashes_with_group || clashes_with_apply {
                return Err(QueryError::invalid(format!(
                    "Duplicate APPLY key '{}'",
                    rule.name
                )));
            }

            apply.push(rule);
        }

        Ok(TransformSpec { group, apply })
    }

    fn apply_rule(&mut self, rule: &JsonValue) -> QueryResult<ApplyRule> {
        let (name, body) = single_entry(as_object(rule, "APPLY rule")?, "APPLY rule")?;

        if name.is_empty() {
            return Err(QueryError::invalid("APPLY key cannot be empty"));
        }
        if name.contains(SEPARATOR) {
            return Err(QueryError::invalid(format!(
                "Cannot have underscore in APPLY key '{}'",
                name
            )));
        }

        let (token, target) = single_entry(as_object(body, "APPLY body")?, "APPLY body")?;
        let token = ApplyToken::from_str(token)
            .ok_or_else(|| QueryError::invalid(format!("Invalid APPLY token '{}'", token)))?;
        let key = target
            .as_str()
            .ok_or_else(|| QueryError::invalid(format!("Invalid key type in {}", token)))?;
        let field = self.resolve_field(key)?;

        if !token.accepts(field) {
            return Err(QueryError::invalid(format!(
                "Invalid key type in {}: '{}' is not a numeric field",
                token, key
            )));
        }

        Ok(ApplyRule {
            name: name.clone(),
            token,
            field,
        })
    }

    // ------------------------------------------------------------------
    // OPTIONS
    // ------------------------------------------------------------------

    fn options(
        &mut self,
        body: &JsonValue,
        transform: Option<&TransformSpec>,
    ) -> QueryResult<(Vec<Column>, Option<OrderSpec>)> {
        let obj = as_object(body, "OPTIONS")?;
        expect_keys(obj, &[&["COLUMNS"], &["COLUMNS", "ORDER"]], "OPTIONS")?;

        let columns = self.columns(&obj["COLUMNS"], transform)?;

        let order = match obj.get("ORDER") {
            Some(order) => Some(order_spec(order, &columns)?),
            None => None,
        };

        Ok((columns, order))
    }

    fn columns(
        &mut self,
        body: &JsonValue,
        transform: Option<&TransformSpec>,
    ) -> QueryResult<Vec<Column>> {
        let keys = body
            .as_array()
            .ok_or_else(|| QueryError::invalid("COLUMNS must be an array"))?;
        if keys.is_empty() {
            return Err(QueryError::invalid("COLUMNS must be a non-empty array"));
        }

        let mut seen = HashSet::new();
        let mut sources = HashSet::new();
        let mut columns = Vec::with_capacity(keys.len());

        for key in keys {
            let name = key
                .as_str()
                .ok_or_else(|| QueryError::invalid("COLUMNS keys must be strings"))?;
            if !seen.insert(name) {
                return Err(QueryError::invalid(format!("Duplicate COLUMNS key '{}'", name)));
            }

            let source = if name.contains(SEPARATOR) {
                ColumnSource::Field(self.resolve_field(name)?)
            } else {
                self.bare_column(name, transform)?
            };

            if !sources.insert(source.clone()) {
                return Err(QueryError::invalid(format!(
                    "COLUMNS key '{}' repeats an earlier column",
                    name
                )));
            }

            columns.push(Column {
                name: name.to_string(),
                source,
            });
        }

        Ok(columns)
    }

    /// A bare column names an APPLY output or a GROUP field
    fn bare_column(
        &self,
        name: &str,
        transform: Option<&TransformSpec>,
    ) -> QueryResult<ColumnSource> {
        let spec = transform.ok_or_else(|| {
            QueryError::invalid(format!(
                "Invalid key '{}' in COLUMNS: bare keys require TRANSFORMATIONS",
                name
            ))
        })?;

        if spec.apply.iter().any(|r| r.name == name) {
            return Ok(ColumnSource::Apply(name.to_string()));
        }

        if let Some(field) = spec.group.iter().find(|f| f.name() == name) {
            return Ok(ColumnSource::Field(*field));
        }

        Err(QueryError::invalid(format!(
            "Invalid key '{}' in COLUMNS: not a GROUP key or APPLY key",
            name
        )))
    }
}

/// ORDER is a column name, or `{dir, keys}` with every key among the columns
fn order_spec(body: &JsonValue, columns: &[Column]) -> QueryResult<OrderSpec> {
    let in_columns = |key: &str| columns.iter().any(|c| c.name == key);

    match body {
        JsonValue::String(key) => {
            if !in_columns(key) {
                return Err(QueryError::invalid(format!(
                    "ORDER key '{}' must be in COLUMNS",
                    key
                )));
            }
            Ok(OrderSpec {
                keys: vec![key.clone()],
                direction: Direction::Up,
            })
        }
        JsonValue::Object(obj) => {
            let has_exactly_dir_and_keys =
                obj.len() == 2 && obj.contains_key("dir") && obj.contains_key("keys");
            if !has_exactly_dir_and_keys {
                return Err(QueryError::invalid("ORDER must have exactly the keys dir and keys"));
            }

            let direction = obj["dir"]
                .as_str()
                .and_then(Direction::from_str)
                .ok_or_else(|| QueryError::invalid("Invalid ORDER direction, must be UP or DOWN"))?;

            let keys = obj["keys"]
                .as_array()
                .ok_or_else(|| QueryError::invalid("ORDER keys must be an array"))?;
            if keys.is_empty() {
                return Err(QueryError::invalid("ORDER keys must be a non-empty array"));
            }

            let mut names = Vec::with_capacity(keys.len());
            for key in keys {
                let key = key
                    .as_str()
                    .ok_or_else(|| QueryError::invalid("ORDER keys must be strings"))?;
                if !in_columns(key) {
                    return Err(QueryError::invalid(format!(
                        "ORDER key '{}' must be in COLUMNS",
                        key
                    )));
                }
                names.push(key.to_string());
            }

            Ok(OrderSpec {
                keys: names,
                direction,
            })
        }
        _ => Err(QueryError::invalid("Invalid ORDER type")),
    }
}

/// GROUP keys plus APPLY names must be exactly the set of COLUMNS
fn check_column_set(columns: &[Column], spec: &TransformSpec) -> QueryResult<()> {
    let expected: HashSet<ColumnSource> = spec
        .group
        .iter()
        .map(|f| ColumnSource::Field(*f))
        .chain(spec.apply.iter().map(|r| ColumnSource::Apply(r.name.clone())))
        .collect();
    let actual: HashSet<ColumnSource> = columns.iter().map(|c| c.source.clone()).collect();

    if expected != actual {
        return Err(QueryError::invalid(
            "COLUMNS must contain exactly the GROUP keys and APPLY keys",
        ));
    }
    Ok(())
}

fn as_object<'q>(value: &'q JsonValue, what: &str) -> QueryResult<&'q Map<String, JsonValue>> {
    value
        .as_object()
        .ok_or_else(|| QueryError::invalid(format!("{} must be an object", what)))
}

/// The one key/value pair of a single-entry object
fn single_entry<'q>(
    obj: &'q Map<String, JsonValue>,
    what: &str,
) -> QueryResult<(&'q String, &'q JsonValue)> {
    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(QueryError::invalid(format!(
            "{} must have exactly one key, found {}",
            what,
            obj.len()
        ))),
    }
}

/// Check the object's keys, in document order, against the allowed layouts
fn expect_keys(obj: &Map<String, JsonValue>, layouts: &[&[&str]], what: &str) -> QueryResult<()> {
    let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    if layouts.iter().any(|layout| *layout == keys.as_slice()) {
        return Ok(());
    }

    let expected = layouts
        .iter()
        .map(|layout| layout.join(", "))
        .collect::<Vec<_>>()
        .join(" | ");
    Err(QueryError::invalid(format!(
        "{} has keys [{}], expected [{}]",
        what,
        keys.join(", "),
        expected
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{RoomField, SectionField};
    use serde_json::json;
    use std::collections::HashMap;

    fn registry() -> HashMap<String, Kind> {
        let mut registry = HashMap::new();
        registry.insert("sections".to_string(), Kind::Sections);
        registry.insert("rooms".to_string(), Kind::Rooms);
        registry
    }

    fn validate(query: JsonValue) -> QueryResult<QueryPlan> {
        let registry = registry();
        QueryValidator::new(&registry).validate(&query)
    }

    fn assert_invalid(query: JsonValue) {
        match validate(query.clone()) {
            Err(QueryError::Validation(_)) => {}
            other => panic!("expected validation error for {}, got {:?}", query, other),
        }
    }

    #[test]
    fn test_simple_query() {
        let plan = validate(json!({
            "WHERE": {"GT": {"sections_avg": 97}},
            "OPTIONS": {"COLUMNS": ["sections_dept", "sections_avg"], "ORDER": "sections_avg"}
        }))
        .unwrap();

        assert_eq!(plan.dataset_id, "sections");
        assert_eq!(plan.kind, Kind::Sections);
        assert_eq!(plan.column_names(), vec!["sections_dept", "sections_avg"]);
        assert_eq!(
            plan.order,
            Some(OrderSpec {
                keys: vec!["sections_avg".to_string()],
                direction: Direction::Up
            })
        );

        let tree = plan.filter.unwrap();
        assert_eq!(
            tree.node(tree.root()),
            &FilterNode::Compare {
                op: CompareOp::Gt,
                field: Field::Section(SectionField::Avg),
                value: 97.0
            }
        );
    }

    #[test]
    fn test_empty_where() {
        let plan = validate(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["rooms_name"]}
        }))
        .unwrap();
        assert!(plan.filter.is_none());
        assert_eq!(plan.kind, Kind::Rooms);
        assert!(plan.order.is_none());
        assert!(!plan.transform.is_grouped());
    }

    #[test]
    fn test_filter_tree_breadth_first() {
        let plan = validate(json!({
            "WHERE": {
                "AND": [
                    {"NOT": {"IS": {"sections_dept": "cpsc"}}},
                    {"OR": [{"GT": {"sections_avg": 90}}, {"EQ": {"sections_year": 2015}}]}
                ]
            },
            "OPTIONS": {"COLUMNS": ["sections_dept"]}
        }))
        .unwrap();

        let tree = plan.filter.unwrap();
        assert_eq!(tree.len(), 6);
        assert_eq!(
            tree.node(NodeId(0)),
            &FilterNode::Logic {
                op: LogicOp::And,
                children: vec![NodeId(1), NodeId(2)]
            }
        );
        assert_eq!(tree.node(NodeId(1)), &FilterNode::Not { child: NodeId(3) });
        assert_eq!(
            tree.node(NodeId(2)),
            &FilterNode::Logic {
                op: LogicOp::Or,
                children: vec![NodeId(4), NodeId(5)]
            }
        );
        assert!(matches!(tree.node(NodeId(3)), FilterNode::Match { .. }));
        assert!(matches!(
            tree.node(NodeId(4)),
            FilterNode::Compare { op: CompareOp::Gt, .. }
        ));
        assert!(matches!(
            tree.node(NodeId(5)),
            FilterNode::Compare { op: CompareOp::Eq, .. }
        ));
    }

    #[test]
    fn test_filter_tree_nested_negation() {
        let plan = validate(json!({
            "WHERE": {
                "NOT": {
                    "AND": [
                        {"NOT": {"GT": {"sections_avg": 90}}},
                        {"IS": {"sections_dept": "cpsc"}}
                    ]
                }
            },
            "OPTIONS": {"COLUMNS": ["sections_dept"]}
        }))
        .unwrap();

        let tree = plan.filter.unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.node(NodeId(0)), &FilterNode::Not { child: NodeId(1) });
        assert_eq!(
            tree.node(NodeId(1)),
            &FilterNode::Logic {
                op: LogicOp::And,
                children: vec![NodeId(2), NodeId(3)]
            }
        );
        assert_eq!(tree.node(NodeId(2)), &FilterNode::Not { child: NodeId(4) });
        assert!(matches!(tree.node(NodeId(3)), FilterNode::Match { .. }));
        assert!(matches!(
            tree.node(NodeId(4)),
            FilterNode::Compare { op: CompareOp::Gt, .. }
        ));

        for (i, node) in tree.nodes().iter().enumerate() {
            assert!(node.children().iter().all(|c| c.0 > i && c.0 < tree.len()));
        }
    }

    #[test]
    fn test_top_level_keys() {
        assert_invalid(json!(null));
        assert_invalid(json!([]));
        assert_invalid(json!({"WHERE": {}}));
        assert_invalid(json!({"OPTIONS": {"COLUMNS": ["sections_avg"]}}));
        assert_invalid(json!({
            "OPTIONS": {"COLUMNS": ["sections_avg"]},
            "WHERE": {}
        }));
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_avg"]},
            "EXTRA": 1
        }));
    }

    #[test]
    fn test_invalid_filters() {
        let with_where = |filter: JsonValue| {
            json!({"WHERE": filter, "OPTIONS": {"COLUMNS": ["sections_avg"]}})
        };

        assert_invalid(with_where(json!({"AND": []})));
        assert_invalid(with_where(json!({"OR": {"GT": {"sections_avg": 1}}})));
        assert_invalid(with_where(json!({"NOT": []})));
        assert_invalid(with_where(json!({"NOT": {}})));
        assert_invalid(with_where(json!({
            "NOT": {"GT": {"sections_avg": 1}, "LT": {"sections_avg": 5}}
        })));
        assert_invalid(with_where(json!({"XOR": []})));
        assert_invalid(with_where(json!({"GT": {"sections_avg": "90"}})));
        assert_invalid(with_where(json!({"GT": {"sections_dept": 90}})));
        assert_invalid(with_where(json!({"IS": {"sections_avg": "90"}})));
        assert_invalid(with_where(json!({"IS": {"sections_dept": 90}})));
        assert_invalid(with_where(json!({"GT": {"sections_avg": 1, "sections_pass": 2}})));
        assert_invalid(with_where(json!({"GT": {"sections_seats": 1}})));
        assert_invalid(with_where(json!({"GT": {"sectionsavg": 1}})));
        assert_invalid(with_where(json!({
            "GT": {"sections_avg": 1},
            "LT": {"sections_avg": 2}
        })));
        assert_invalid(with_where(json!({"AND": [{}]})));
        assert_invalid(with_where(json!("cpsc")));
    }

    #[test]
    fn test_interior_wildcard_rejected() {
        assert_invalid(json!({
            "WHERE": {"IS": {"sections_instructor": "g*regor"}},
            "OPTIONS": {"COLUMNS": ["sections_instructor"]}
        }));

        let plan = validate(json!({
            "WHERE": {"IS": {"sections_instructor": "*ales*"}},
            "OPTIONS": {"COLUMNS": ["sections_instructor"]}
        }))
        .unwrap();
        let tree = plan.filter.unwrap();
        assert_eq!(
            tree.node(tree.root()),
            &FilterNode::Match {
                field: Field::Section(SectionField::Instructor),
                pattern: Pattern::Contains("ales".into())
            }
        );
    }

    #[test]
    fn test_unknown_dataset() {
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["courses_avg"]}
        }));
    }

    #[test]
    fn test_two_datasets_rejected() {
        assert_invalid(json!({
            "WHERE": {"GT": {"rooms_seats": 100}},
            "OPTIONS": {"COLUMNS": ["sections_avg"]}
        }));
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_avg", "rooms_seats"]}
        }));
        assert_invalid(json!({
            "WHERE": {"OR": [{"GT": {"sections_avg": 1}}, {"GT": {"rooms_seats": 1}}]},
            "OPTIONS": {"COLUMNS": ["sections_avg"]}
        }));
    }

    #[test]
    fn test_invalid_options() {
        assert_invalid(json!({"WHERE": {}, "OPTIONS": {}}));
        assert_invalid(json!({"WHERE": {}, "OPTIONS": {"COLUMNS": []}}));
        assert_invalid(json!({"WHERE": {}, "OPTIONS": {"COLUMNS": "sections_avg"}}));
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_avg", "sections_avg"]}
        }));
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"ORDER": "sections_avg", "COLUMNS": ["sections_avg"]}
        }));
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_avg"], "ORDER": "sections_pass"}
        }));
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_avg"], "LIMIT": 10}
        }));
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["maxAvg"]}
        }));
    }

    #[test]
    fn test_order_object() {
        let plan = validate(json!({
            "WHERE": {},
            "OPTIONS": {
                "COLUMNS": ["rooms_shortname", "rooms_seats"],
                "ORDER": {"dir": "DOWN", "keys": ["rooms_seats", "rooms_shortname"]}
            }
        }))
        .unwrap();

        assert_eq!(
            plan.order,
            Some(OrderSpec {
                keys: vec!["rooms_seats".to_string(), "rooms_shortname".to_string()],
                direction: Direction::Down
            })
        );

        let with_order = |order: JsonValue| {
            json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["rooms_seats"], "ORDER": order}})
        };
        assert_invalid(with_order(json!({"dir": "SIDEWAYS", "keys": ["rooms_seats"]})));
        assert_invalid(with_order(json!({"dir": "UP", "keys": []})));
        assert_invalid(with_order(json!({"dir": "UP", "keys": ["rooms_lat"]})));
        assert_invalid(with_order(json!({"dir": "UP"})));
        assert_invalid(with_order(json!({"dir": "UP", "keys": ["rooms_seats"], "x": 1})));
        assert_invalid(with_order(json!(["rooms_seats"])));
    }

    #[test]
    fn test_transformations() {
        let plan = validate(json!({
            "WHERE": {"IS": {"rooms_furniture": "*Tables*"}},
            "OPTIONS": {
                "COLUMNS": ["rooms_shortname", "maxSeats"],
                "ORDER": {"dir": "DOWN", "keys": ["maxSeats"]}
            },
            "TRANSFORMATIONS": {
                "GROUP": ["rooms_shortname"],
                "APPLY": [{"maxSeats": {"MAX": "rooms_seats"}}]
            }
        }))
        .unwrap();

        assert_eq!(plan.transform.group, vec![Field::Room(RoomField::Shortname)]);
        assert_eq!(
            plan.transform.apply,
            vec![ApplyRule {
                name: "maxSeats".to_string(),
                token: ApplyToken::Max,
                field: Field::Room(RoomField::Seats)
            }]
        );
        assert_eq!(
            plan.columns[1].source,
            ColumnSource::Apply("maxSeats".to_string())
        );
    }

    #[test]
    fn test_count_accepts_string_field() {
        let plan = validate(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_dept", "instructors"]},
            "TRANSFORMATIONS": {
                "GROUP": ["sections_dept"],
                "APPLY": [{"instructors": {"COUNT": "sections_instructor"}}]
            }
        }))
        .unwrap();
        assert_eq!(plan.transform.apply[0].token, ApplyToken::Count);
    }

    #[test]
    fn test_invalid_transformations() {
        let with_transform = |columns: JsonValue, transform: JsonValue| {
            json!({"WHERE": {}, "OPTIONS": {"COLUMNS": columns}, "TRANSFORMATIONS": transform})
        };

        // non-numeric field for MAX
        assert_invalid(with_transform(
            json!(["sections_dept", "m"]),
            json!({"GROUP": ["sections_dept"], "APPLY": [{"m": {"MAX": "sections_title"}}]}),
        ));
        // unknown token
        assert_invalid(with_transform(
            json!(["sections_dept", "m"]),
            json!({"GROUP": ["sections_dept"], "APPLY": [{"m": {"MEDIAN": "sections_avg"}}]}),
        ));
        // underscore in apply key
        assert_invalid(with_transform(
            json!(["sections_dept", "max_avg"]),
            json!({"GROUP": ["sections_dept"], "APPLY": [{"max_avg": {"MAX": "sections_avg"}}]}),
        ));
        // empty apply key
        assert_invalid(with_transform(
            json!(["sections_dept"]),
            json!({"GROUP": ["sections_dept"], "APPLY": [{"": {"MAX": "sections_avg"}}]}),
        ));
        // duplicate apply keys
        assert_invalid(with_transform(
            json!(["sections_dept", "m"]),
            json!({"GROUP": ["sections_dept"], "APPLY": [
                {"m": {"MAX": "sections_avg"}},
                {"m": {"MIN": "sections_avg"}}
            ]}),
        ));
        // apply key duplicates a group key
        assert_invalid(with_transform(
            json!(["sections_dept", "dept"]),
            json!({"GROUP": ["sections_dept"], "APPLY": [{"dept": {"COUNT": "sections_uuid"}}]}),
        ));
        // empty GROUP
        assert_invalid(with_transform(
            json!(["m"]),
            json!({"GROUP": [], "APPLY": [{"m": {"MAX": "sections_avg"}}]}),
        ));
        // wrong key order
        assert_invalid(with_transform(
            json!(["sections_dept"]),
            json!({"APPLY": [], "GROUP": ["sections_dept"]}),
        ));
        // apply on another dataset
        assert_invalid(with_transform(
            json!(["sections_dept", "m"]),
            json!({"GROUP": ["sections_dept"], "APPLY": [{"m": {"MAX": "rooms_seats"}}]}),
        ));
        // apply body with two tokens
        assert_invalid(with_transform(
            json!(["sections_dept", "m"]),
            json!({"GROUP": ["sections_dept"], "APPLY": [
                {"m": {"MAX": "sections_avg", "MIN": "sections_avg"}}
            ]}),
        ));
    }

    #[test]
    fn test_column_set_must_match() {
        // column not in GROUP
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_dept", "sections_title"]},
            "TRANSFORMATIONS": {"GROUP": ["sections_dept"], "APPLY": []}
        }));
        // apply key missing from COLUMNS
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_dept"]},
            "TRANSFORMATIONS": {
                "GROUP": ["sections_dept"],
                "APPLY": [{"m": {"MAX": "sections_avg"}}]
            }
        }));
        // group key missing from COLUMNS
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_dept", "m"]},
            "TRANSFORMATIONS": {
                "GROUP": ["sections_dept", "sections_year"],
                "APPLY": [{"m": {"MAX": "sections_avg"}}]
            }
        }));
        // bare column that is neither
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_dept", "other"]},
            "TRANSFORMATIONS": {"GROUP": ["sections_dept"], "APPLY": []}
        }));
    }

    #[test]
    fn test_columns_resolving_to_same_field() {
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_dept", "dept"]},
            "TRANSFORMATIONS": {"GROUP": ["sections_dept"], "APPLY": []}
        }));
        assert_invalid(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["dept", "sections_dept"]},
            "TRANSFORMATIONS": {"GROUP": ["sections_dept"], "APPLY": []}
        }));

        let plan = validate(json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["dept"]},
            "TRANSFORMATIONS": {"GROUP": ["sections_dept"], "APPLY": []}
        }))
        .unwrap();
        assert_eq!(plan.columns.len(), 1);
    }

    #[test]
    fn test_validate_str() {
        let registry = registry();
        let validator = QueryValidator::new(&registry);

        let plan = validator
            .validate_str(r#"{"WHERE": {}, "OPTIONS": {"COLUMNS": ["rooms_seats"]}}"#)
            .unwrap();
        assert_eq!(plan.dataset_id, "rooms");

        assert!(matches!(
            validator.validate_str("{not json"),
            Err(QueryError::Validation(_))
        ));
    }
}
